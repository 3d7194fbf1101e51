//! Fixed-step simulation clock
//!
//! Host frames arrive at whatever cadence the display runs at. The clock
//! turns their timestamps into a count of equal fixed ticks, and caps how much
//! time a single slow frame may hand to the simulation.

use thiserror::Error;

/// Default simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
/// Default catch-up bound: one stalled frame runs at most this many ticks
pub const DEFAULT_MAX_CATCH_UP_TICKS: u32 = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClockConfigError {
    #[error("fixed dt must be finite and positive, got {0} ms")]
    InvalidFixedDt(f64),

    #[error(
        "max accumulator ({max_accumulator_ms} ms) must be finite \
         and at least one fixed dt ({fixed_dt_ms} ms)"
    )]
    InvalidMaxAccumulator {
        max_accumulator_ms: f64,
        fixed_dt_ms: f64,
    },

    #[error("tick rate must be non-zero")]
    ZeroTickRate,

    #[error("catch-up bound must allow at least one tick per frame")]
    ZeroCatchUp,
}

/// Validated timing parameters, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockConfig {
    fixed_dt_ms: f64,
    max_accumulator_ms: f64,
}

impl ClockConfig {
    pub fn new(fixed_dt_ms: f64, max_accumulator_ms: f64) -> Result<Self, ClockConfigError> {
        if !fixed_dt_ms.is_finite() || fixed_dt_ms <= 0.0 {
            return Err(ClockConfigError::InvalidFixedDt(fixed_dt_ms));
        }
        if !max_accumulator_ms.is_finite() || max_accumulator_ms < fixed_dt_ms {
            return Err(ClockConfigError::InvalidMaxAccumulator {
                max_accumulator_ms,
                fixed_dt_ms,
            });
        }
        Ok(Self {
            fixed_dt_ms,
            max_accumulator_ms,
        })
    }

    /// `max_catch_up_ticks` fixed steps worth of accumulator.
    pub fn from_tick_rate(
        tick_rate_hz: u32,
        max_catch_up_ticks: u32,
    ) -> Result<Self, ClockConfigError> {
        if tick_rate_hz == 0 {
            return Err(ClockConfigError::ZeroTickRate);
        }
        if max_catch_up_ticks == 0 {
            return Err(ClockConfigError::ZeroCatchUp);
        }
        let fixed_dt_ms = 1000.0 / tick_rate_hz as f64;
        Self::new(fixed_dt_ms, fixed_dt_ms * max_catch_up_ticks as f64)
    }

    #[inline]
    pub fn fixed_dt_ms(&self) -> f64 {
        self.fixed_dt_ms
    }

    #[inline]
    pub fn max_accumulator_ms(&self) -> f64 {
        self.max_accumulator_ms
    }

    /// Upper bound on fixed ticks executed for one host frame.
    pub fn max_ticks_per_frame(&self) -> u32 {
        (self.max_accumulator_ms / self.fixed_dt_ms).ceil() as u32
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        let fixed_dt_ms = 1000.0 / TICK_RATE_HZ as f64;
        Self {
            fixed_dt_ms,
            max_accumulator_ms: fixed_dt_ms * DEFAULT_MAX_CATCH_UP_TICKS as f64,
        }
    }
}

/// Simulation time tracker
///
/// Invariant: `0 <= accumulator < fixed_dt + max_accumulator` at all times,
/// and `accumulator < fixed_dt` once a frame's ticks have been drained.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    config: ClockConfig,
    last_host_time: Option<f64>,
    accumulator: f64,
    tick_count: u64,
}

impl SimulationClock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            last_host_time: None,
            accumulator: 0.0,
            tick_count: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    #[inline]
    pub fn fixed_dt_ms(&self) -> f64 {
        self.config.fixed_dt_ms
    }

    #[inline]
    pub fn accumulator_ms(&self) -> f64 {
        self.accumulator
    }

    pub fn last_host_time(&self) -> Option<f64> {
        self.last_host_time
    }

    /// Fixed ticks executed since the run started; doubles as the cooldown clock.
    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Simulated time covered by the executed ticks.
    pub fn simulated_ms(&self) -> f64 {
        self.tick_count as f64 * self.config.fixed_dt_ms
    }

    /// Record a host timestamp and return the elapsed time since the previous one.
    ///
    /// The first timestamp after creation (or after [`resync`](Self::resync))
    /// yields 0. A host clock that steps backwards also yields 0.
    pub fn advance_host(&mut self, now_ms: f64) -> f64 {
        let delta = match self.last_host_time {
            Some(last) => (now_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_host_time = Some(now_ms);
        delta
    }

    /// Add frame time to the accumulator. Returns true if the cap discarded time.
    pub fn accumulate(&mut self, delta_ms: f64) -> bool {
        let delta_ms = if delta_ms.is_finite() { delta_ms.max(0.0) } else { 0.0 };
        self.accumulator += delta_ms;
        if self.accumulator > self.config.max_accumulator_ms {
            self.accumulator = self.config.max_accumulator_ms;
            true
        } else {
            false
        }
    }

    /// Whether enough time has accumulated for another fixed tick.
    #[inline]
    pub fn tick_ready(&self) -> bool {
        self.accumulator >= self.config.fixed_dt_ms
    }

    /// Account for one executed fixed tick.
    pub fn complete_tick(&mut self) {
        debug_assert!(self.tick_ready());
        self.tick_count += 1;
        self.accumulator -= self.config.fixed_dt_ms;
    }

    /// Drop pending time debt and forget the last host timestamp, so the
    /// next frame starts from a zero delta.
    pub fn resync(&mut self) {
        self.accumulator = 0.0;
        self.last_host_time = None;
    }

    /// Back to the state of a fresh run.
    pub fn reset(&mut self) {
        self.resync();
        self.tick_count = 0;
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drain(clock: &mut SimulationClock) -> u32 {
        let mut ticks = 0;
        while clock.tick_ready() {
            clock.complete_tick();
            ticks += 1;
        }
        ticks
    }

    fn frame(clock: &mut SimulationClock, now: f64) -> u32 {
        let delta = clock.advance_host(now);
        clock.accumulate(delta);
        drain(clock)
    }

    #[test]
    fn test_default_is_sixty_hz_with_four_tick_cap() {
        let config = ClockConfig::default();
        assert!((config.fixed_dt_ms() - 16.666_666).abs() < 1e-3);
        assert_eq!(config.max_ticks_per_frame(), 4);
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            ClockConfig::new(0.0, 10.0),
            Err(ClockConfigError::InvalidFixedDt(0.0))
        );
        assert!(ClockConfig::new(f64::NAN, 10.0).is_err());
        assert!(matches!(
            ClockConfig::new(16.0, 8.0),
            Err(ClockConfigError::InvalidMaxAccumulator { .. })
        ));
        assert_eq!(
            ClockConfig::from_tick_rate(0, 4),
            Err(ClockConfigError::ZeroTickRate)
        );
        assert_eq!(
            ClockConfig::from_tick_rate(60, 0),
            Err(ClockConfigError::ZeroCatchUp)
        );
        let config = ClockConfig::from_tick_rate(30, 2).unwrap();
        assert!((config.max_accumulator_ms() - 66.666_666).abs() < 1e-3);
    }

    #[test]
    fn test_first_frame_has_zero_delta() {
        let mut clock = SimulationClock::default();
        assert_eq!(clock.advance_host(123_456.0), 0.0);
        assert_eq!(clock.advance_host(123_466.0), 10.0);
    }

    #[test]
    fn test_backwards_host_time_is_ignored() {
        let mut clock = SimulationClock::default();
        clock.advance_host(100.0);
        assert_eq!(clock.advance_host(50.0), 0.0);
        assert_eq!(clock.advance_host(60.0), 10.0);
    }

    #[test]
    fn test_stalled_frame_is_clamped() {
        let config = ClockConfig::new(16.67, 66.67).unwrap();
        let mut clock = SimulationClock::new(config);

        let mut now = 0.0;
        assert_eq!(frame(&mut clock, now), 0);
        now += 16.67;
        assert_eq!(frame(&mut clock, now), 1);
        now += 16.67;
        assert_eq!(frame(&mut clock, now), 1);
        now += 500.0;
        let ticks = frame(&mut clock, now);
        assert!(ticks <= 4, "ran {ticks} ticks");
        assert!(ticks >= 3);
        assert!(clock.accumulator_ms() >= 0.0);
        assert!(clock.accumulator_ms() < config.fixed_dt_ms());
    }

    #[test]
    fn test_accumulate_reports_clamp() {
        let mut clock = SimulationClock::new(ClockConfig::new(10.0, 40.0).unwrap());
        assert!(!clock.accumulate(30.0));
        assert!(clock.accumulate(30.0));
        assert_eq!(clock.accumulator_ms(), 40.0);
        assert!(!clock.accumulate(f64::NAN));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut clock = SimulationClock::new(ClockConfig::new(10.0, 40.0).unwrap());
        clock.advance_host(0.0);
        clock.accumulate(35.0);
        drain(&mut clock);
        assert_eq!(clock.tick_count(), 3);
        clock.reset();
        assert_eq!(clock.tick_count(), 0);
        assert_eq!(clock.accumulator_ms(), 0.0);
        assert_eq!(clock.last_host_time(), None);
    }

    proptest! {
        #[test]
        fn prop_ticks_per_frame_bounded(
            fixed_dt in 1.0f64..50.0,
            catch_up in 1u32..8,
            deltas in proptest::collection::vec(0.0f64..2_000.0, 1..64),
        ) {
            let config = ClockConfig::new(fixed_dt, fixed_dt * catch_up as f64).unwrap();
            let bound = config.max_ticks_per_frame();
            let mut clock = SimulationClock::new(config);
            let mut now = 0.0;
            clock.advance_host(now);
            for delta in deltas {
                now += delta;
                let ticks = frame(&mut clock, now);
                prop_assert!(ticks <= bound);
                prop_assert!(clock.accumulator_ms() >= 0.0);
                prop_assert!(clock.accumulator_ms() < config.fixed_dt_ms());
            }
        }
    }
}
