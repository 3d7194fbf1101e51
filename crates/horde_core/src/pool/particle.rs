use crate::lifecycle::{compact, Lifecycle, Liveness};
use crate::math::DeterministicRng;
use glam::Vec2;
use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    Spark,
    Smoke,
    Debris,
    Ember,
}

/// Spawn parameters. Velocities are in world units per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleConfig {
    /// Base velocity before jitter
    pub velocity: Vec2,
    /// Maximum angular deviation from `velocity`, in radians
    pub spread: f32,
    /// Maximum relative speed deviation, 0 = exact
    pub speed_jitter: f32,
    /// Lifetime in ticks (0 is treated as 1)
    pub lifetime: u32,
    /// Added to vertical velocity every tick
    pub gravity: f32,
    /// Velocity multiplier applied every tick
    pub friction: f32,
    pub size: f32,
}

impl ParticleConfig {
    pub fn for_kind(kind: ParticleKind) -> Self {
        match kind {
            ParticleKind::Spark => Self {
                velocity: Vec2::new(0.0, -4.0),
                spread: PI,
                speed_jitter: 0.5,
                lifetime: 20,
                gravity: 0.1,
                friction: 0.92,
                size: 2.0,
            },
            ParticleKind::Smoke => Self {
                velocity: Vec2::new(0.0, -0.6),
                spread: 0.6,
                speed_jitter: 0.3,
                lifetime: 45,
                gravity: -0.01,
                friction: 0.98,
                size: 6.0,
            },
            ParticleKind::Debris => Self {
                velocity: Vec2::new(0.0, -3.0),
                spread: PI,
                speed_jitter: 0.6,
                lifetime: 35,
                gravity: 0.25,
                friction: 0.96,
                size: 3.0,
            },
            ParticleKind::Ember => Self {
                velocity: Vec2::new(0.0, -1.2),
                spread: 0.8,
                speed_jitter: 0.4,
                lifetime: 60,
                gravity: -0.02,
                friction: 0.99,
                size: 1.5,
            },
        }
    }
}

/// A pre-allocated particle slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: [f32; 4],
    pub kind: ParticleKind,
    pub size: f32,
    /// Remaining ticks; 0 while the slot is free
    pub life: u32,
    pub max_life: u32,
    pub gravity: f32,
    pub friction: f32,
}

impl Particle {
    const FREE: Particle = Particle {
        pos: Vec2::ZERO,
        vel: Vec2::ZERO,
        color: [0.0; 4],
        kind: ParticleKind::Spark,
        size: 0.0,
        life: 0,
        max_life: 0,
        gravity: 0.0,
        friction: 1.0,
    };

    /// Remaining life in `[0, 1]`, for fading.
    pub fn life_fraction(&self) -> f32 {
        if self.max_life == 0 {
            0.0
        } else {
            self.life as f32 / self.max_life as f32
        }
    }

    fn step(&mut self) {
        self.pos += self.vel;
        self.vel *= self.friction;
        self.vel.y += self.gravity;
        self.life = self.life.saturating_sub(1);
    }
}

impl Lifecycle for Particle {
    fn liveness(&self) -> Liveness {
        Liveness::Countdown {
            remaining: Some(self.life as f32),
        }
    }
}

/// Slot index of a spawned particle. Valid until that particle expires or
/// the pool is cleared; the slot is recycled afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticleHandle(u32);

impl ParticleHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Fixed-capacity particle pool.
///
/// All slots and both index lists are allocated at construction and never
/// grow. Invariant: `active_len() + free_len() == capacity()`.
pub struct ParticlePool {
    slots: Vec<Particle>,
    free: Vec<u32>,
    active: Vec<u32>,
    rng: DeterministicRng,
    dropped: u64,
}

impl ParticlePool {
    pub fn new(capacity: usize, seed: u64) -> Self {
        let capacity = capacity.min(u32::MAX as usize);
        let mut free = Vec::with_capacity(capacity);
        // Reversed so slots are handed out lowest first
        free.extend((0..capacity as u32).rev());
        Self {
            slots: vec![Particle::FREE; capacity],
            free,
            active: Vec::with_capacity(capacity),
            rng: DeterministicRng::new(seed),
            dropped: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Spawn requests rejected because the pool was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Take a free slot and initialize it. Returns `None` when the pool is
    /// exhausted; the request is dropped.
    pub fn spawn(
        &mut self,
        position: Vec2,
        color: [f32; 4],
        kind: ParticleKind,
        config: &ParticleConfig,
    ) -> Option<ParticleHandle> {
        let Some(idx) = self.free.pop() else {
            self.dropped += 1;
            tracing::trace!(capacity = self.capacity(), "particle pool exhausted");
            return None;
        };

        let angle = self.rng.next_signed() * config.spread;
        let speed = 1.0 + self.rng.next_signed() * config.speed_jitter;
        let lifetime = config.lifetime.max(1);

        self.slots[idx as usize] = Particle {
            pos: position,
            vel: Vec2::from_angle(angle).rotate(config.velocity) * speed,
            color,
            kind,
            size: config.size,
            life: lifetime,
            max_life: lifetime,
            gravity: config.gravity,
            friction: config.friction,
        };
        self.active.push(idx);
        Some(ParticleHandle(idx))
    }

    /// Spawn up to `count` particles, returning how many fit.
    pub fn burst(
        &mut self,
        position: Vec2,
        color: [f32; 4],
        kind: ParticleKind,
        config: &ParticleConfig,
        count: usize,
    ) -> usize {
        (0..count)
            .take_while(|_| self.spawn(position, color, kind, config).is_some())
            .count()
    }

    /// Advance every active particle one tick and recycle the expired ones.
    pub fn update(&mut self) {
        let slots = &mut self.slots;
        let free = &mut self.free;
        compact(&mut self.active, |&idx| {
            let particle = &mut slots[idx as usize];
            particle.step();
            if particle.is_alive() {
                true
            } else {
                free.push(idx);
                false
            }
        });
    }

    /// Return every active slot to the free set for a new run. The drop
    /// counter and the jitter generator start over as well.
    pub fn clear(&mut self) {
        for idx in self.active.drain(..) {
            self.slots[idx as usize].life = 0;
            self.free.push(idx);
        }
        self.dropped = 0;
        self.rng.reset();
    }

    /// The particle behind `handle`, if its slot is still active.
    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.slots.get(handle.index()).filter(|p| p.life > 0)
    }

    /// Active particles in spawn order.
    pub fn iter_active(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.active.iter().map(move |&idx| &self.slots[idx as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WHITE: [f32; 4] = [1.0; 4];

    fn still(lifetime: u32) -> ParticleConfig {
        ParticleConfig {
            velocity: Vec2::ZERO,
            spread: 0.0,
            speed_jitter: 0.0,
            lifetime,
            gravity: 0.0,
            friction: 1.0,
            size: 1.0,
        }
    }

    fn assert_invariant(pool: &ParticlePool) {
        assert_eq!(pool.active_len() + pool.free_len(), pool.capacity());
    }

    #[test]
    fn test_capacity_two_scenario() {
        let mut pool = ParticlePool::new(2, 1);
        let short = still(1);
        let long = still(5);

        assert!(pool.spawn(Vec2::ZERO, WHITE, ParticleKind::Spark, &short).is_some());
        assert!(pool.spawn(Vec2::ZERO, WHITE, ParticleKind::Spark, &long).is_some());
        assert_invariant(&pool);

        assert!(pool.spawn(Vec2::ZERO, WHITE, ParticleKind::Spark, &long).is_none());
        assert_eq!(pool.active_len(), 2);
        assert_eq!(pool.free_len(), 0);
        assert_eq!(pool.dropped(), 1);

        pool.update();
        assert_eq!(pool.active_len(), 1);
        assert_invariant(&pool);

        assert!(pool.spawn(Vec2::ZERO, WHITE, ParticleKind::Smoke, &long).is_some());
        assert!(pool.spawn(Vec2::ZERO, WHITE, ParticleKind::Smoke, &long).is_none());
        assert_invariant(&pool);
    }

    #[test]
    fn test_integration_step() {
        let mut pool = ParticlePool::new(4, 1);
        let config = ParticleConfig {
            velocity: Vec2::new(2.0, 0.0),
            spread: 0.0,
            speed_jitter: 0.0,
            lifetime: 10,
            gravity: 0.5,
            friction: 0.5,
            size: 1.0,
        };
        let handle = pool
            .spawn(Vec2::new(10.0, 10.0), WHITE, ParticleKind::Debris, &config)
            .unwrap();

        pool.update();
        let p = pool.get(handle).unwrap();
        assert_eq!(p.pos, Vec2::new(12.0, 10.0));
        assert_eq!(p.vel, Vec2::new(1.0, 0.5));
        assert_eq!(p.life, 9);
        assert!((p.life_fraction() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_zero_lifetime_lasts_one_tick() {
        let mut pool = ParticlePool::new(1, 1);
        let handle = pool
            .spawn(Vec2::ZERO, WHITE, ParticleKind::Ember, &still(0))
            .unwrap();
        assert!(pool.get(handle).is_some());
        pool.update();
        assert!(pool.get(handle).is_none());
        assert_eq!(pool.free_len(), 1);
    }

    #[test]
    fn test_clear_returns_everything() {
        let mut pool = ParticlePool::new(8, 3);
        let config = ParticleConfig::for_kind(ParticleKind::Spark);
        assert_eq!(
            pool.burst(Vec2::ZERO, WHITE, ParticleKind::Spark, &config, 5),
            5
        );
        pool.clear();
        assert_eq!(pool.active_len(), 0);
        assert_eq!(pool.free_len(), 8);
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.iter_active().count(), 0);
    }

    #[test]
    fn test_burst_stops_at_capacity() {
        let mut pool = ParticlePool::new(3, 3);
        let config = ParticleConfig::for_kind(ParticleKind::Debris);
        assert_eq!(
            pool.burst(Vec2::ZERO, WHITE, ParticleKind::Debris, &config, 10),
            3
        );
        assert_eq!(pool.dropped(), 1);
        assert_invariant(&pool);
    }

    #[test]
    fn test_spread_stays_within_cone() {
        let mut pool = ParticlePool::new(64, 11);
        let config = ParticleConfig {
            velocity: Vec2::new(1.0, 0.0),
            spread: 0.25,
            speed_jitter: 0.0,
            ..still(4)
        };
        pool.burst(Vec2::ZERO, WHITE, ParticleKind::Spark, &config, 64);
        for p in pool.iter_active() {
            assert!(p.vel.y.atan2(p.vel.x).abs() <= 0.25 + 1e-5);
            assert!((p.vel.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_same_seed_same_particles() {
        let config = ParticleConfig::for_kind(ParticleKind::Spark);
        let mut a = ParticlePool::new(16, 99);
        let mut b = ParticlePool::new(16, 99);
        a.burst(Vec2::ZERO, WHITE, ParticleKind::Spark, &config, 16);
        b.burst(Vec2::ZERO, WHITE, ParticleKind::Spark, &config, 16);
        assert!(a.iter_active().eq(b.iter_active()));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Spawn(u32),
        Update,
        Clear,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            6 => (0u32..6).prop_map(Op::Spawn),
            3 => Just(Op::Update),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn prop_active_plus_free_is_capacity(
            capacity in 0usize..16,
            ops in proptest::collection::vec(op(), 0..128),
        ) {
            let mut pool = ParticlePool::new(capacity, 5);
            for op in ops {
                let before = (pool.active_len(), pool.free_len());
                match op {
                    Op::Spawn(lifetime) => {
                        let config = still(lifetime);
                        let spawned = pool.spawn(Vec2::ZERO, WHITE, ParticleKind::Spark, &config);
                        if before.1 == 0 {
                            prop_assert!(spawned.is_none());
                            prop_assert_eq!((pool.active_len(), pool.free_len()), before);
                        }
                    }
                    Op::Update => pool.update(),
                    Op::Clear => pool.clear(),
                }
                prop_assert_eq!(pool.active_len() + pool.free_len(), pool.capacity());
                prop_assert_eq!(pool.capacity(), capacity);
            }
        }
    }
}
