//! Exponential-moving-average timing of named phases
//!
//! Phases live in a fixed table sized at compile time, so recording never
//! allocates. Names are `&'static str` and compared by value.

use std::time::{Duration, Instant};

/// Maximum number of distinct phases a monitor tracks
pub const MAX_PHASES: usize = 16;

/// Smoothed timing for one named phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStats {
    pub name: &'static str,
    pub average_ms: f64,
    pub last_ms: f64,
    pub samples: u64,
}

impl PhaseStats {
    const EMPTY: PhaseStats = PhaseStats {
        name: "",
        average_ms: 0.0,
        last_ms: 0.0,
        samples: 0,
    };
}

#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    enabled: bool,
    smoothing: f64,
    phases: [PhaseStats; MAX_PHASES],
    len: usize,
}

impl PerformanceMonitor {
    /// `smoothing` is the weight of the newest sample, clamped to `(0, 1]`.
    pub fn new(smoothing: f64) -> Self {
        let smoothing = if smoothing.is_finite() && smoothing > 0.0 {
            smoothing.min(1.0)
        } else {
            crate::DEFAULT_SMOOTHING
        };
        Self {
            enabled: true,
            smoothing,
            phases: [PhaseStats::EMPTY; MAX_PHASES],
            len: 0,
        }
    }

    pub fn disabled() -> Self {
        let mut monitor = Self::new(crate::DEFAULT_SMOOTHING);
        monitor.enabled = false;
        monitor
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// Start timestamp for a phase, `None` when disabled.
    #[inline]
    pub fn start(&self) -> Option<Instant> {
        if self.enabled {
            Some(Instant::now())
        } else {
            None
        }
    }

    /// Close a phase opened with [`start`](Self::start).
    #[inline]
    pub fn stop(&mut self, name: &'static str, started: Option<Instant>) {
        if let Some(started) = started {
            self.record(name, started.elapsed());
        }
    }

    pub fn record(&mut self, name: &'static str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        let ms = elapsed.as_secs_f64() * 1000.0;
        let smoothing = self.smoothing;
        // Phases beyond the table are ignored
        let Some(stats) = self.slot_mut(name) else {
            return;
        };
        stats.average_ms = if stats.samples == 0 {
            ms
        } else {
            stats.average_ms + smoothing * (ms - stats.average_ms)
        };
        stats.last_ms = ms;
        stats.samples += 1;
    }

    pub fn time<F, R>(&mut self, name: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let started = self.start();
        let result = f();
        self.stop(name, started);
        result
    }

    pub fn get(&self, name: &str) -> Option<PhaseStats> {
        self.phases[..self.len]
            .iter()
            .find(|stats| stats.name == name)
            .copied()
    }

    pub fn average_ms(&self, name: &str) -> f64 {
        self.get(name).map_or(0.0, |stats| stats.average_ms)
    }

    pub fn samples(&self, name: &str) -> u64 {
        self.get(name).map_or(0, |stats| stats.samples)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseStats> {
        self.phases[..self.len].iter()
    }

    pub fn reset(&mut self) {
        self.phases = [PhaseStats::EMPTY; MAX_PHASES];
        self.len = 0;
    }

    fn slot_mut(&mut self, name: &'static str) -> Option<&mut PhaseStats> {
        let idx = match self.phases[..self.len].iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None if self.len < MAX_PHASES => {
                self.phases[self.len] = PhaseStats {
                    name,
                    ..PhaseStats::EMPTY
                };
                self.len += 1;
                self.len - 1
            }
            None => return None,
        };
        Some(&mut self.phases[idx])
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(crate::DEFAULT_SMOOTHING)
    }
}
