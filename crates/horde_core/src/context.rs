//! Simulation context and the per-tick pipeline
//!
//! Everything the scheduler mutates lives in one [`SimulationContext`], so
//! independent simulations (tests, headless runs) never share state.

use crate::lifecycle::Lifecycle;
use crate::pool::ParticlePool;
use crate::query::{Positioned, SpatialHashConfig, SpatialHashGrid};
use crate::registry::{ActorRef, Registries, Registry, RegistryError, RegistryId};
use crate::scheduler::SchedulerError;
use crate::time::{ClockConfig, SimulationClock};
use horde_metrics::{phase, PerformanceMonitor};

/// Capability shared by every kind of simulated entity.
///
/// Games implement this on a closed enum of their actor kinds. An `Err`
/// from `update` is fatal: it halts the scheduler.
pub trait Actor: Lifecycle + Positioned + Sized {
    type Error: std::error::Error + Send + Sync + 'static;

    fn update(&mut self, cx: &mut TickContext<'_, Self>) -> Result<(), Self::Error>;
}

/// What an update hook may see and touch during a tick.
///
/// The spatial index reflects positions as of the end of the previous tick.
/// Spawns are deferred until every hook of the tick has run.
pub struct TickContext<'a, A> {
    tick: u64,
    fixed_dt_ms: f64,
    current: ActorRef,
    index: &'a SpatialHashGrid,
    particles: &'a mut ParticlePool,
    spawns: &'a mut Vec<(RegistryId, A)>,
}

impl<'a, A> TickContext<'a, A> {
    /// Number of the tick being executed (0 for the first tick of a run).
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[inline]
    pub fn fixed_dt_ms(&self) -> f64 {
        self.fixed_dt_ms
    }

    /// Reference to the actor being updated, comparable with index entries.
    #[inline]
    pub fn current(&self) -> ActorRef {
        self.current
    }

    #[inline]
    pub fn index(&self) -> &SpatialHashGrid {
        self.index
    }

    #[inline]
    pub fn particles(&mut self) -> &mut ParticlePool {
        self.particles
    }

    /// Queue an actor to be appended to `registry` after this tick's updates.
    pub fn spawn(&mut self, registry: RegistryId, actor: A) {
        self.spawns.push((registry, actor));
    }
}

/// Construction parameters for a [`SimulationContext`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub clock: ClockConfig,
    pub spatial: SpatialHashConfig,
    pub particle_capacity: usize,
    pub particle_seed: u64,
    /// Deferred spawns reserved up front
    pub spawn_queue_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            spatial: SpatialHashConfig::default(),
            particle_capacity: 1024,
            particle_seed: 0,
            spawn_queue_capacity: 64,
        }
    }
}

pub struct SimulationContext<A> {
    pub(crate) clock: SimulationClock,
    registries: Registries<A>,
    index: SpatialHashGrid,
    particles: ParticlePool,
    monitor: PerformanceMonitor,
    spawn_queue: Vec<(RegistryId, A)>,
}

impl<A> SimulationContext<A> {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            clock: SimulationClock::new(config.clock),
            registries: Registries::new(),
            index: SpatialHashGrid::new(config.spatial),
            particles: ParticlePool::new(config.particle_capacity, config.particle_seed),
            monitor: PerformanceMonitor::disabled(),
            spawn_queue: Vec::with_capacity(config.spawn_queue_capacity),
        }
    }

    pub fn with_monitor(mut self, monitor: PerformanceMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn register(&mut self, registry: Registry<A>) -> Result<RegistryId, RegistryError> {
        self.registries.register(registry)
    }

    /// Append an actor from outside the tick pipeline (wave spawners, tests).
    pub fn spawn(&mut self, registry: RegistryId, actor: A) -> Result<(), RegistryError> {
        self.registries.push(registry, actor)
    }

    #[inline]
    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.clock.tick_count()
    }

    #[inline]
    pub fn registries(&self) -> &Registries<A> {
        &self.registries
    }

    #[inline]
    pub fn registries_mut(&mut self) -> &mut Registries<A> {
        &mut self.registries
    }

    #[inline]
    pub fn index(&self) -> &SpatialHashGrid {
        &self.index
    }

    #[inline]
    pub fn particles(&self) -> &ParticlePool {
        &self.particles
    }

    #[inline]
    pub fn particles_mut(&mut self) -> &mut ParticlePool {
        &mut self.particles
    }

    #[inline]
    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    #[inline]
    pub fn monitor_mut(&mut self) -> &mut PerformanceMonitor {
        &mut self.monitor
    }

    /// Spawns queued by hooks that have not been flushed yet.
    pub fn pending_spawns(&self) -> usize {
        self.spawn_queue.len()
    }

    /// Start a fresh run: clock, registries, index and pool go back to empty.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.registries.clear_all();
        self.spawn_queue.clear();
        self.index.clear();
        self.particles.clear();
        tracing::info!("simulation reset");
    }
}

impl<A: Actor> SimulationContext<A> {
    /// Execute one fixed tick. Returns the number of compacted entries.
    ///
    /// Order: update hooks (registry order, then slot order, live entries
    /// only), particle update, deferred spawns, index rebuild, compaction.
    /// An entry that finishes during the tick stays in its registry until
    /// the compaction at the end.
    pub(crate) fn run_tick(&mut self) -> Result<usize, SchedulerError> {
        let tick_started = self.monitor.start();
        let tick = self.clock.tick_count();
        let fixed_dt_ms = self.clock.fixed_dt_ms();

        for (registry_id, registry) in self.registries.iter_mut() {
            let name = registry.name();
            for (slot, actor) in registry.iter_mut().enumerate() {
                if !actor.is_alive() {
                    continue;
                }
                let mut cx = TickContext {
                    tick,
                    fixed_dt_ms,
                    current: ActorRef {
                        registry: registry_id,
                        slot: slot as u32,
                    },
                    index: &self.index,
                    particles: &mut self.particles,
                    spawns: &mut self.spawn_queue,
                };
                actor
                    .update(&mut cx)
                    .map_err(|source| SchedulerError::UpdateHook {
                        registry: name,
                        slot,
                        source: Box::new(source),
                    })?;
            }
        }

        self.particles.update();

        for (registry_id, actor) in self.spawn_queue.drain(..) {
            if let Err(err) = self.registries.push(registry_id, actor) {
                tracing::warn!(%err, "dropping deferred spawn");
            }
        }

        let rebuild_started = self.monitor.start();
        self.index.clear();
        for (registry_id, registry) in self.registries.iter() {
            if registry.is_indexed() {
                self.index.insert_registry(registry_id, registry.as_slice());
            }
        }
        self.monitor.stop(phase::INDEX_REBUILD, rebuild_started);

        let compaction_started = self.monitor.start();
        let removed = self.registries.compact_all();
        self.monitor.stop(phase::COMPACTION, compaction_started);

        self.monitor.stop(phase::TICK, tick_started);
        Ok(removed)
    }
}
