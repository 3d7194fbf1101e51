//! Host frame interval tracking
//!
//! Fed with the same host timestamps the scheduler receives, so it measures
//! display cadence rather than simulation work.

use super::ring_buffer::RingBuffer;

pub struct FrameTimer {
    last_host_time: Option<f64>,
    frame_times: RingBuffer<f64>,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            last_host_time: None,
            frame_times: RingBuffer::new(capacity),
        }
    }

    /// Record a host frame timestamp in milliseconds.
    pub fn record_host_time(&mut self, now_ms: f64) {
        if let Some(last) = self.last_host_time {
            let interval = now_ms - last;
            if interval >= 0.0 {
                self.frame_times.push(interval);
            }
        }
        self.last_host_time = Some(now_ms);
    }

    pub fn fps(&self) -> f64 {
        let avg = self.frame_times.average();
        if avg > 0.0 {
            1000.0 / avg
        } else {
            0.0
        }
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.frame_times.average()
    }

    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        self.frame_times.min_max()
    }

    pub fn reset(&mut self) {
        self.last_host_time = None;
        self.frame_times.clear();
    }
}
