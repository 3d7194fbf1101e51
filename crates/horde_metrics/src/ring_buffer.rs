//! Fixed-window sample history
//!
//! Keeps the most recent `window` samples; the oldest is overwritten once
//! the window is full.

pub struct RingBuffer<T> {
    slots: Vec<T>,
    window: usize,
    /// Slot the next sample lands in once the window is full
    head: usize,
}

impl<T: Copy> RingBuffer<T> {
    /// A zero window still keeps the latest sample.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            slots: Vec::with_capacity(window),
            window,
            head: 0,
        }
    }

    pub fn push(&mut self, sample: T) {
        if self.slots.len() == self.window {
            self.slots[self.head] = sample;
            self.head = (self.head + 1) % self.window;
        } else {
            self.slots.push(sample);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window
    }

    /// Most recently pushed sample.
    pub fn latest(&self) -> Option<T> {
        if self.slots.len() < self.window {
            self.slots.last().copied()
        } else {
            let idx = (self.head + self.window - 1) % self.window;
            self.slots.get(idx).copied()
        }
    }

    /// Samples oldest first.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer).copied()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

impl RingBuffer<f64> {
    /// Mean of the window, 0 when empty.
    pub fn average(&self) -> f64 {
        match self.slots.len() {
            0 => 0.0,
            n => self.iter().sum::<f64>() / n as f64,
        }
    }

    /// `(min, max)` of the window, `(0, 0)` when empty.
    pub fn min_max(&self) -> (f64, f64) {
        self.iter()
            .fold(None, |acc: Option<(f64, f64)>, s| match acc {
                None => Some((s, s)),
                Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
            })
            .unwrap_or((0.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_overwrites_oldest() {
        let mut intervals = RingBuffer::new(3);
        for ms in [16.0, 17.0, 15.0, 250.0] {
            intervals.push(ms);
        }

        assert_eq!(intervals.len(), 3);
        assert_eq!(intervals.iter().collect::<Vec<_>>(), vec![17.0, 15.0, 250.0]);
        assert_eq!(intervals.latest(), Some(250.0));
        assert_eq!(intervals.average(), 94.0);
        assert_eq!(intervals.min_max(), (15.0, 250.0));
    }

    #[test]
    fn test_partial_window() {
        let mut intervals = RingBuffer::new(4);
        assert_eq!(intervals.latest(), None);
        assert_eq!(intervals.min_max(), (0.0, 0.0));

        intervals.push(10.0);
        intervals.push(30.0);
        assert_eq!(intervals.iter().collect::<Vec<_>>(), vec![10.0, 30.0]);
        assert_eq!(intervals.latest(), Some(30.0));
        assert_eq!(intervals.average(), 20.0);

        intervals.clear();
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_zero_window_holds_latest() {
        let mut intervals = RingBuffer::new(0);
        intervals.push(1.0);
        intervals.push(2.0);
        assert_eq!(intervals.capacity(), 1);
        assert_eq!(intervals.latest(), Some(2.0));
        assert_eq!(intervals.average(), 2.0);
    }
}
