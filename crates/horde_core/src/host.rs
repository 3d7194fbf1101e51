//! Host frame sources
//!
//! The scheduler never reads a wall clock itself. Whatever drives it (a
//! display callback, a headless loop, a test) hands it one monotonic
//! millisecond timestamp per frame through [`HostYield`].

use std::time::{Duration, Instant};

/// Yields host frame timestamps in milliseconds. `None` ends the run.
pub trait HostYield {
    fn next_frame(&mut self) -> Option<f64>;
}

/// Scripted timestamps for tests and deterministic replays.
///
/// The first frame reports `start_ms`; each later frame advances by the next
/// scripted delta.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    now_ms: f64,
    /// The start frame has not been yielded yet
    start_pending: bool,
    deltas: Vec<f64>,
    cursor: usize,
}

impl VirtualClock {
    pub fn new(start_ms: f64, deltas: impl IntoIterator<Item = f64>) -> Self {
        Self {
            now_ms: start_ms,
            start_pending: true,
            deltas: deltas.into_iter().collect(),
            cursor: 0,
        }
    }

    /// `frames` frames spaced `interval_ms` apart. Zero frames is an empty script.
    pub fn fixed(start_ms: f64, interval_ms: f64, frames: usize) -> Self {
        let deltas = std::iter::repeat_n(interval_ms, frames.saturating_sub(1));
        let mut clock = Self::new(start_ms, deltas);
        clock.start_pending = frames > 0;
        clock
    }

    /// Replace the delta leading into `frame` (frame 0 is the start frame).
    /// Frames outside the script are ignored.
    pub fn set_delta(&mut self, frame: usize, delta_ms: f64) {
        if let Some(delta) = frame.checked_sub(1).and_then(|i| self.deltas.get_mut(i)) {
            *delta = delta_ms;
        }
    }

    /// Append a delta, e.g. to inject a stall mid-run.
    pub fn push(&mut self, delta_ms: f64) {
        self.deltas.push(delta_ms);
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Frames left to yield.
    pub fn remaining(&self) -> usize {
        let pending = self.deltas.len() - self.cursor;
        pending + usize::from(self.start_pending)
    }
}

impl HostYield for VirtualClock {
    fn next_frame(&mut self) -> Option<f64> {
        if self.start_pending {
            self.start_pending = false;
            return Some(self.now_ms);
        }
        let delta = *self.deltas.get(self.cursor)?;
        self.cursor += 1;
        self.now_ms += delta;
        Some(self.now_ms)
    }
}

/// Wall-clock host that paces frames to a target interval.
#[derive(Debug)]
pub struct RealTimeHost {
    origin: Instant,
    frame_interval: Duration,
    next_deadline: Option<Instant>,
    remaining: Option<u64>,
}

impl RealTimeHost {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            frame_interval,
            next_deadline: None,
            remaining: None,
        }
    }

    /// Pace to `hz` frames per second. Zero disables pacing.
    pub fn with_rate(hz: u32) -> Self {
        let interval = if hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / hz as f64)
        };
        Self::new(interval)
    }

    /// Stop after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }
}

impl HostYield for RealTimeHost {
    fn next_frame(&mut self) -> Option<f64> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        if let Some(deadline) = self.next_deadline {
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
        let now = Instant::now();
        self.next_deadline = Some(now + self.frame_interval);
        Some(now.duration_since(self.origin).as_secs_f64() * 1000.0)
    }
}
