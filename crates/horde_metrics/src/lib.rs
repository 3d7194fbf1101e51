//! Horde Metrics - passive timing instrumentation for the simulation core
//!
//! Provides phase timing that has no effect on simulation results and
//! completely vanishes in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use horde_metrics::PerformanceMonitor;
//!
//! let mut monitor = PerformanceMonitor::new(0.1);
//! let started = monitor.start();
//! // ... do work ...
//! monitor.stop("tick", started);
//! println!("tick: {:.3} ms", monitor.average_ms("tick"));
//! ```
//!
//! With the feature enabled the monitor can still be switched off at
//! runtime, in which case each call costs a single boolean check. Without
//! the `metrics` feature all instrumentation compiles to nothing.

#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod monitor;
#[cfg(feature = "metrics")]
mod ring_buffer;

#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use monitor::{PerformanceMonitor, PhaseStats, MAX_PHASES};
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;

/// Well-known phase names recorded by the scheduler.
pub mod phase {
    pub const FRAME: &str = "frame";
    pub const TICK: &str = "tick";
    pub const INDEX_REBUILD: &str = "index-rebuild";
    pub const COMPACTION: &str = "compaction";
    pub const RENDER: &str = "render";
}

/// Default EMA smoothing factor (weight of the newest sample)
pub const DEFAULT_SMOOTHING: f64 = 0.1;

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub const MAX_PHASES: usize = 0;

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStats {
    pub name: &'static str,
    pub average_ms: f64,
    pub last_ms: f64,
    pub samples: u64,
}

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Clone, Default)]
pub struct PerformanceMonitor;

#[cfg(not(feature = "metrics"))]
impl PerformanceMonitor {
    pub fn new(_smoothing: f64) -> Self { Self }
    pub fn disabled() -> Self { Self }
    pub fn is_enabled(&self) -> bool { false }
    pub fn set_enabled(&mut self, _enabled: bool) {}
    pub fn smoothing(&self) -> f64 { 0.0 }
    #[inline]
    pub fn start(&self) -> Option<std::time::Instant> { None }
    #[inline]
    pub fn stop(&mut self, _name: &'static str, _started: Option<std::time::Instant>) {}
    pub fn record(&mut self, _name: &'static str, _elapsed: std::time::Duration) {}
    pub fn time<F, R>(&mut self, _name: &'static str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn average_ms(&self, _name: &str) -> f64 { 0.0 }
    pub fn samples(&self, _name: &str) -> u64 { 0 }
    pub fn get(&self, _name: &str) -> Option<PhaseStats> { None }
    pub fn iter(&self) -> impl Iterator<Item = &PhaseStats> { std::iter::empty() }
    pub fn reset(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn record_host_time(&mut self, _now_ms: f64) {}
    pub fn fps(&self) -> f64 { 0.0 }
    pub fn frame_time_ms(&self) -> f64 { 0.0 }
    pub fn frame_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
    pub fn reset(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_window: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _sample: T) {}
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
    pub fn capacity(&self) -> usize { 0 }
    pub fn latest(&self) -> Option<T> { None }
    pub fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_api_compiles_in_either_configuration() {
        let mut monitor = super::PerformanceMonitor::new(super::DEFAULT_SMOOTHING);
        let started = monitor.start();
        monitor.stop(super::phase::TICK, started);
        let value = monitor.time(super::phase::RENDER, || 7);
        assert_eq!(value, 7);

        let mut timer = super::FrameTimer::new(60);
        timer.record_host_time(0.0);
        timer.record_host_time(16.0);
        let _ = timer.fps();
    }
}
