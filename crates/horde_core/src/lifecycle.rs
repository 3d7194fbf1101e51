//! Entity liveness and in-place compaction
//!
//! Registries shrink every tick. Removal is a single stable forward pass that
//! reuses the existing backing storage, so churn of hundreds of entities per
//! second never reaches the allocator.

/// Liveness signal exposed by every registry entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Liveness {
    /// Gameplay entities (hostiles, projectiles, pickups) flag themselves done.
    Flag { finished: bool },
    /// Ephemeral visuals count down; `None` means no expiry.
    Countdown { remaining: Option<f32> },
}

impl Liveness {
    #[inline]
    pub fn is_alive(self) -> bool {
        match self {
            Liveness::Flag { finished } => !finished,
            Liveness::Countdown { remaining } => remaining.is_none_or(|r| r > 0.0),
        }
    }
}

pub trait Lifecycle {
    fn liveness(&self) -> Liveness;

    #[inline]
    fn is_alive(&self) -> bool {
        self.liveness().is_alive()
    }
}

/// Remove every entry for which `is_alive` returns false, keeping the
/// survivors in their original relative order. Returns the number removed.
///
/// A write cursor trails the read position; live entries are swapped down to
/// it and the tail is truncated afterwards. Capacity is left untouched.
pub fn compact<T, F>(entries: &mut Vec<T>, mut is_alive: F) -> usize
where
    F: FnMut(&T) -> bool,
{
    let len = entries.len();
    let mut write = 0;
    for read in 0..len {
        if is_alive(&entries[read]) {
            if read != write {
                entries.swap(read, write);
            }
            write += 1;
        }
    }
    entries.truncate(write);
    len - write
}

/// Frame-based cooldown measured against the simulation tick counter.
///
/// Lives on the entity record itself, so it dies with the entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cooldown {
    ready_at: u64,
}

impl Cooldown {
    pub const READY: Cooldown = Cooldown { ready_at: 0 };

    #[inline]
    pub fn ready(&self, now_tick: u64) -> bool {
        now_tick >= self.ready_at
    }

    /// Start the cooldown at `now_tick`, lasting `ticks` ticks.
    pub fn trigger(&mut self, now_tick: u64, ticks: u64) {
        self.ready_at = now_tick.saturating_add(ticks);
    }

    /// Trigger only if ready, returning whether it fired.
    pub fn try_trigger(&mut self, now_tick: u64, ticks: u64) -> bool {
        if self.ready(now_tick) {
            self.trigger(now_tick, ticks);
            true
        } else {
            false
        }
    }

    pub fn remaining(&self, now_tick: u64) -> u64 {
        self.ready_at.saturating_sub(now_tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        name: char,
        finished: bool,
    }

    impl Lifecycle for Entry {
        fn liveness(&self) -> Liveness {
            Liveness::Flag {
                finished: self.finished,
            }
        }
    }

    fn entries(layout: &[(char, bool)]) -> Vec<Entry> {
        layout.iter()
            .map(|&(name, finished)| Entry { name, finished })
            .collect()
    }

    #[test]
    fn test_liveness_predicates() {
        assert!(Liveness::Flag { finished: false }.is_alive());
        assert!(!Liveness::Flag { finished: true }.is_alive());
        assert!(Liveness::Countdown { remaining: None }.is_alive());
        assert!(Liveness::Countdown { remaining: Some(0.5) }.is_alive());
        assert!(!Liveness::Countdown { remaining: Some(0.0) }.is_alive());
        assert!(!Liveness::Countdown { remaining: Some(-3.0) }.is_alive());
    }

    #[test]
    fn test_compact_removes_finished_in_order() {
        let mut registry = entries(&[
            ('A', false),
            ('B', true),
            ('C', false),
            ('D', true),
            ('E', false),
        ]);
        let capacity = registry.capacity();

        let removed = compact(&mut registry, Entry::is_alive);

        assert_eq!(removed, 2);
        let names: Vec<char> = registry.iter().map(|e| e.name).collect();
        assert_eq!(names, vec!['A', 'C', 'E']);
        assert_eq!(registry.capacity(), capacity);
    }

    #[test]
    fn test_compact_empty_and_all_dead() {
        let mut empty: Vec<Entry> = Vec::new();
        assert_eq!(compact(&mut empty, Entry::is_alive), 0);

        let mut dead = entries(&[('A', true), ('B', true)]);
        assert_eq!(compact(&mut dead, Entry::is_alive), 2);
        assert!(dead.is_empty());
    }

    #[test]
    fn test_cooldown() {
        let mut cooldown = Cooldown::READY;
        assert!(cooldown.ready(0));
        assert!(cooldown.try_trigger(10, 30));
        assert!(!cooldown.ready(39));
        assert_eq!(cooldown.remaining(25), 15);
        assert!(!cooldown.try_trigger(20, 30));
        assert!(cooldown.ready(40));
        assert_eq!(cooldown.remaining(41), 0);
    }

    proptest! {
        #[test]
        fn prop_compact_is_stable_and_idempotent(
            flags in proptest::collection::vec(any::<bool>(), 0..64),
        ) {
            let original: Vec<(usize, bool)> = flags.iter().copied().enumerate().collect();
            let mut registry = original.clone();

            compact(&mut registry, |&(_, finished)| !finished);
            let expected: Vec<(usize, bool)> =
                original.iter().copied().filter(|&(_, finished)| !finished).collect();
            prop_assert_eq!(&registry, &expected);

            let once = registry.clone();
            let removed = compact(&mut registry, |&(_, finished)| !finished);
            prop_assert_eq!(removed, 0);
            prop_assert_eq!(registry, once);
        }
    }
}
