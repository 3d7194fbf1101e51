//! Deterministic math utilities
//!
//! Re-exports glam with a small seeded generator for decorative jitter

pub use glam::*;

/// Deterministic random number generator (64-bit LCG, high bits out)
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    seed: u64,
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, state: seed }
    }

    /// Rewind to the initial seed
    pub fn reset(&mut self) {
        self.state = self.seed;
    }

    pub fn next_u32(&mut self) -> u32 {
        // Knuth MMIX constants
        const A: u64 = 6364136223846793005;
        const C: u64 = 1442695040888963407;

        self.state = A.wrapping_mul(self.state).wrapping_add(C);
        (self.state >> 32) as u32
    }

    /// Uniform in `[0, 1)`
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform in `[-1, 1)`
    pub fn next_signed(&mut self) -> f32 {
        self.next_f32() * 2.0 - 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = DeterministicRng::new(42);
        let mut b = DeterministicRng::new(42);
        for _ in 0..32 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_unit_range() {
        let mut rng = DeterministicRng::new(7);
        for _ in 0..1000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
            let s = rng.next_signed();
            assert!((-1.0..1.0).contains(&s));
        }
    }

    #[test]
    fn test_reset_rewinds() {
        let mut rng = DeterministicRng::new(9);
        let first = rng.next_u32();
        rng.next_u32();
        rng.reset();
        assert_eq!(rng.next_u32(), first);
    }
}
