//! Fixed-capacity pools for short-lived records.

mod particle;

pub use particle::{Particle, ParticleConfig, ParticleHandle, ParticleKind, ParticlePool};
