//! Arena demo: waves of hostiles drifting in on a central turret
//!
//! All distances are world units, velocities are units per tick.

use horde_core::lifecycle::{Cooldown, Lifecycle, Liveness};
use horde_core::math::{DeterministicRng, Vec2};
use horde_core::pool::{ParticleConfig, ParticleKind};
use horde_core::query::Positioned;
use horde_core::registry::{Registry, RegistryError, RegistryId};
use horde_core::{Actor, Scheduler, SimulationConfig, SimulationContext, TickContext};
use horde_metrics::PerformanceMonitor;
use std::f32::consts::TAU;
use thiserror::Error;

const ARENA_RADIUS: f32 = 600.0;
const BASE_RADIUS: f32 = 20.0;
const HOSTILE_SPEED: f32 = 1.2;
const HOSTILE_HP: i32 = 3;
const PROJECTILE_SPEED: f32 = 9.0;
const PROJECTILE_TTL: u32 = 60;
const HIT_RADIUS: f32 = 14.0;
const TURRET_RANGE: f32 = 360.0;
const TURRET_FIRE_TICKS: u64 = 6;
const PICKUP_SPEED: f32 = 2.0;
const PICKUP_TTL: u32 = 600;
const TEXT_MS: f32 = 800.0;
const WAVE_INTERVAL_TICKS: u64 = 90;
const WAVE_SIZE: u32 = 8;
const WAVES: u32 = 12;

const SPARK: [f32; 4] = [1.0, 0.9, 0.4, 1.0];
const DEBRIS: [f32; 4] = [0.6, 0.2, 0.2, 1.0];
const EMBER: [f32; 4] = [1.0, 0.4, 0.1, 1.0];

/// Registry ids of the demo, in update order.
#[derive(Debug, Clone, Copy)]
pub struct Layers {
    pub waves: RegistryId,
    pub turrets: RegistryId,
    pub hostiles: RegistryId,
    pub projectiles: RegistryId,
    pub pickups: RegistryId,
    pub text: RegistryId,
}

#[derive(Debug, Error)]
pub enum DemoError {
    #[error("{kind} left the finite plane on tick {tick}")]
    NonFinite { kind: &'static str, tick: u64 },
}

#[derive(Debug, Clone)]
pub enum GameActor {
    Spawner(Spawner),
    Turret(Turret),
    Hostile(Hostile),
    Projectile(Projectile),
    Pickup(Pickup),
    FloatingText(FloatingText),
}

#[derive(Debug, Clone)]
pub struct Spawner {
    layers: Layers,
    rng: DeterministicRng,
    cooldown: Cooldown,
    waves_left: u32,
}

#[derive(Debug, Clone)]
pub struct Turret {
    layers: Layers,
    pos: Vec2,
    cooldown: Cooldown,
}

#[derive(Debug, Clone)]
pub struct Hostile {
    layers: Layers,
    pos: Vec2,
    vel: Vec2,
    hp: i32,
    finished: bool,
}

#[derive(Debug, Clone)]
pub struct Projectile {
    layers: Layers,
    pos: Vec2,
    vel: Vec2,
    ttl: u32,
    finished: bool,
}

#[derive(Debug, Clone)]
pub struct Pickup {
    layers: Layers,
    pos: Vec2,
    ttl: u32,
    finished: bool,
}

#[derive(Debug, Clone)]
pub struct FloatingText {
    pos: Vec2,
    label: &'static str,
    remaining_ms: f32,
}

impl Spawner {
    pub fn new(layers: Layers, seed: u64) -> Self {
        Self {
            layers,
            rng: DeterministicRng::new(seed),
            cooldown: Cooldown::READY,
            waves_left: WAVES,
        }
    }

    fn update(&mut self, cx: &mut TickContext<'_, GameActor>) -> Result<(), DemoError> {
        if self.waves_left == 0 || !self.cooldown.try_trigger(cx.tick(), WAVE_INTERVAL_TICKS) {
            return Ok(());
        }
        let origin = self.rng.next_f32() * TAU;
        for i in 0..WAVE_SIZE {
            let spread = (i as f32 / WAVE_SIZE as f32) * TAU;
            let angle = origin + spread + self.rng.next_signed() * 0.1;
            let pos = Vec2::from_angle(angle) * ARENA_RADIUS;
            let vel = -pos.normalize_or_zero() * HOSTILE_SPEED;
            cx.spawn(
                self.layers.hostiles,
                GameActor::Hostile(Hostile::new(self.layers, pos, vel)),
            );
        }
        self.waves_left -= 1;
        tracing::debug!(tick = cx.tick(), waves_left = self.waves_left, "wave spawned");
        Ok(())
    }
}

impl Turret {
    pub fn new(layers: Layers, pos: Vec2) -> Self {
        Self {
            layers,
            pos,
            cooldown: Cooldown::READY,
        }
    }

    fn update(&mut self, cx: &mut TickContext<'_, GameActor>) -> Result<(), DemoError> {
        if !self.cooldown.ready(cx.tick()) {
            return Ok(());
        }
        let hostiles = self.layers.hostiles;
        let Some(target) = cx.index().nearest(self.pos.x, self.pos.y, TURRET_RANGE, |entry| {
            entry.actor.registry == hostiles
        }) else {
            return Ok(());
        };
        let direction = (target.pos - self.pos).normalize_or_zero();
        if direction == Vec2::ZERO {
            return Ok(());
        }
        self.cooldown.trigger(cx.tick(), TURRET_FIRE_TICKS);
        let projectile = Projectile::new(self.layers, self.pos, direction * PROJECTILE_SPEED);
        cx.spawn(self.layers.projectiles, GameActor::Projectile(projectile));
        Ok(())
    }
}

impl Hostile {
    pub fn new(layers: Layers, pos: Vec2, vel: Vec2) -> Self {
        Self {
            layers,
            pos,
            vel,
            hp: HOSTILE_HP,
            finished: false,
        }
    }

    fn update(&mut self, cx: &mut TickContext<'_, GameActor>) -> Result<(), DemoError> {
        let projectiles = self.layers.projectiles;
        let mut hits = 0;
        cx.index().for_each_near(self.pos.x, self.pos.y, HIT_RADIUS, |entry| {
            if entry.actor.registry == projectiles
                && entry.pos.distance_squared(self.pos) <= HIT_RADIUS * HIT_RADIUS
            {
                hits += 1;
            }
            true
        });

        if hits > 0 {
            self.hp -= hits;
            if self.hp <= 0 {
                self.finished = true;
                burst(cx, self.pos, DEBRIS, ParticleKind::Debris, 12);
                let pickup = Pickup::new(self.layers, self.pos);
                cx.spawn(self.layers.pickups, GameActor::Pickup(pickup));
                let text = FloatingText::new(self.pos, "down");
                cx.spawn(self.layers.text, GameActor::FloatingText(text));
                return Ok(());
            }
            burst(cx, self.pos, SPARK, ParticleKind::Spark, 4);
        }

        self.pos += self.vel;
        if !self.pos.is_finite() {
            return Err(DemoError::NonFinite {
                kind: "hostile",
                tick: cx.tick(),
            });
        }
        if self.pos.length() <= BASE_RADIUS {
            self.finished = true;
            burst(cx, self.pos, EMBER, ParticleKind::Ember, 6);
            let text = FloatingText::new(self.pos, "breach");
            cx.spawn(self.layers.text, GameActor::FloatingText(text));
        }
        Ok(())
    }
}

impl Projectile {
    pub fn new(layers: Layers, pos: Vec2, vel: Vec2) -> Self {
        Self {
            layers,
            pos,
            vel,
            ttl: PROJECTILE_TTL,
            finished: false,
        }
    }

    fn update(&mut self, cx: &mut TickContext<'_, GameActor>) -> Result<(), DemoError> {
        let hostiles = self.layers.hostiles;
        // Check from the indexed position so both sides of a hit agree
        let hit = cx.index().find_within(self.pos.x, self.pos.y, HIT_RADIUS, |entry| {
            entry.actor.registry == hostiles
        });
        if hit.is_some() {
            self.finished = true;
            burst(cx, self.pos, SPARK, ParticleKind::Spark, 6);
            return Ok(());
        }

        self.pos += self.vel;
        if !self.pos.is_finite() {
            return Err(DemoError::NonFinite {
                kind: "projectile",
                tick: cx.tick(),
            });
        }
        self.ttl = self.ttl.saturating_sub(1);
        if self.ttl == 0 || self.pos.length() > ARENA_RADIUS {
            self.finished = true;
        }
        Ok(())
    }
}

impl Pickup {
    pub fn new(layers: Layers, pos: Vec2) -> Self {
        Self {
            layers,
            pos,
            ttl: PICKUP_TTL,
            finished: false,
        }
    }

    fn update(&mut self, cx: &mut TickContext<'_, GameActor>) -> Result<(), DemoError> {
        let to_base = -self.pos;
        let distance = to_base.length();
        if distance <= BASE_RADIUS {
            self.finished = true;
            let text = FloatingText::new(self.pos, "+1");
            cx.spawn(self.layers.text, GameActor::FloatingText(text));
            return Ok(());
        }
        self.pos += to_base / distance * PICKUP_SPEED.min(distance);
        self.ttl = self.ttl.saturating_sub(1);
        self.finished = self.ttl == 0;
        Ok(())
    }
}

impl FloatingText {
    pub fn new(pos: Vec2, label: &'static str) -> Self {
        Self {
            pos,
            label,
            remaining_ms: TEXT_MS,
        }
    }

    fn update(&mut self, cx: &mut TickContext<'_, GameActor>) -> Result<(), DemoError> {
        if self.remaining_ms == TEXT_MS {
            tracing::trace!(label = self.label, x = self.pos.x, y = self.pos.y, "floating text");
        }
        self.pos.y -= 0.5;
        self.remaining_ms -= cx.fixed_dt_ms() as f32;
        Ok(())
    }
}

fn burst(
    cx: &mut TickContext<'_, GameActor>,
    pos: Vec2,
    color: [f32; 4],
    kind: ParticleKind,
    count: usize,
) {
    let config = ParticleConfig::for_kind(kind);
    cx.particles().burst(pos, color, kind, &config, count);
}

impl Lifecycle for GameActor {
    fn liveness(&self) -> Liveness {
        match self {
            GameActor::Spawner(s) => Liveness::Flag {
                finished: s.waves_left == 0,
            },
            GameActor::Turret(_) => Liveness::Flag { finished: false },
            GameActor::Hostile(h) => Liveness::Flag { finished: h.finished },
            GameActor::Projectile(p) => Liveness::Flag { finished: p.finished },
            GameActor::Pickup(p) => Liveness::Flag { finished: p.finished },
            GameActor::FloatingText(t) => Liveness::Countdown {
                remaining: Some(t.remaining_ms),
            },
        }
    }
}

impl Positioned for GameActor {
    fn position(&self) -> Option<Vec2> {
        match self {
            GameActor::Spawner(_) => None,
            GameActor::Turret(t) => Some(t.pos),
            GameActor::Hostile(h) => Some(h.pos),
            GameActor::Projectile(p) => Some(p.pos),
            GameActor::Pickup(p) => Some(p.pos),
            GameActor::FloatingText(t) => Some(t.pos),
        }
    }
}

impl Actor for GameActor {
    type Error = DemoError;

    fn update(&mut self, cx: &mut TickContext<'_, Self>) -> Result<(), DemoError> {
        match self {
            GameActor::Spawner(s) => s.update(cx),
            GameActor::Turret(t) => t.update(cx),
            GameActor::Hostile(h) => h.update(cx),
            GameActor::Projectile(p) => p.update(cx),
            GameActor::Pickup(p) => p.update(cx),
            GameActor::FloatingText(t) => t.update(cx),
        }
    }
}

/// Register the demo's registries. Only hostiles and projectiles are indexed.
pub fn register_layers(
    context: &mut SimulationContext<GameActor>,
) -> Result<Layers, RegistryError> {
    Ok(Layers {
        waves: context.register(Registry::new("waves"))?,
        turrets: context.register(Registry::new("turrets"))?,
        hostiles: context.register(Registry::new("hostiles").with_capacity(512).indexed())?,
        projectiles: context
            .register(Registry::new("projectiles").with_capacity(256).indexed())?,
        pickups: context.register(Registry::new("pickups").with_capacity(128))?,
        text: context.register(Registry::new("floating_text").with_capacity(128))?,
    })
}

/// A ready-to-run arena: one wave spawner and a turret at the origin.
pub fn build(
    config: SimulationConfig,
    monitor: PerformanceMonitor,
    seed: u64,
) -> Result<(Scheduler<GameActor>, Layers), RegistryError> {
    let mut context = SimulationContext::new(config).with_monitor(monitor);
    let layers = register_layers(&mut context)?;
    context.spawn(layers.waves, GameActor::Spawner(Spawner::new(layers, seed)))?;
    context.spawn(layers.turrets, GameActor::Turret(Turret::new(layers, Vec2::ZERO)))?;
    Ok((Scheduler::new(context), layers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use horde_core::{FrameView, VirtualClock};

    fn registry_len(scheduler: &Scheduler<GameActor>, id: RegistryId) -> usize {
        scheduler.context().registries().get(id).unwrap().len()
    }

    #[test]
    fn test_projectile_kills_hostile() {
        let mut context = SimulationContext::new(SimulationConfig::default());
        let layers = register_layers(&mut context).unwrap();
        let mut hostile = Hostile::new(layers, Vec2::new(100.0, 0.0), Vec2::ZERO);
        hostile.hp = 1;
        context.spawn(layers.hostiles, GameActor::Hostile(hostile)).unwrap();
        let projectile = Projectile::new(layers, Vec2::new(100.0, 0.0), Vec2::ZERO);
        context.spawn(layers.projectiles, GameActor::Projectile(projectile)).unwrap();
        let mut scheduler = Scheduler::new(context);

        scheduler.on_host_frame(0.0, &mut ()).unwrap();
        // Two ticks: the first builds the index, the second resolves the hit.
        let report = scheduler.on_host_frame(40.0, &mut ()).unwrap();

        assert_eq!(report.ticks, 2);
        assert_eq!(report.removed, 2);
        assert_eq!(registry_len(&scheduler, layers.hostiles), 0);
        assert_eq!(registry_len(&scheduler, layers.projectiles), 0);
        assert_eq!(registry_len(&scheduler, layers.pickups), 1);
        assert_eq!(registry_len(&scheduler, layers.text), 1);
        assert_eq!(scheduler.context().particles().active_len(), 18);
    }

    #[test]
    fn test_floating_text_expires() {
        let mut context = SimulationContext::new(SimulationConfig::default());
        let layers = register_layers(&mut context).unwrap();
        let text = FloatingText::new(Vec2::ZERO, "+1");
        assert_eq!(text.label, "+1");
        context.spawn(layers.text, GameActor::FloatingText(text)).unwrap();
        let mut scheduler = Scheduler::new(context);

        scheduler.on_host_frame(0.0, &mut ()).unwrap();
        let mut now = 0.0;
        while registry_len(&scheduler, layers.text) > 0 {
            now += 16.0;
            scheduler.on_host_frame(now, &mut ()).unwrap();
            assert!(now < 2000.0, "text never expired");
        }
        assert!(scheduler.context().tick_count() >= 48);
    }

    fn snapshot(seed: u64, monitor: PerformanceMonitor) -> (u64, Vec<usize>, usize, usize) {
        let (mut scheduler, _) = build(SimulationConfig::default(), monitor, seed).unwrap();
        let mut host = VirtualClock::fixed(0.0, 1000.0 / 60.0, 900);
        host.set_delta(450, 250.0);
        let mut peak_hostiles = 0;
        let mut track = |view: &FrameView<'_, GameActor>| {
            let registries = view.registries();
            let hostiles = registries.find("hostiles").and_then(|id| registries.get(id).ok());
            peak_hostiles = peak_hostiles.max(hostiles.map_or(0, Registry::len));
        };
        scheduler.run(&mut host, &mut track).unwrap();

        let context = scheduler.context();
        let lens = context.registries().iter().map(|(_, r)| r.len()).collect();
        (context.tick_count(), lens, context.particles().active_len(), peak_hostiles)
    }

    #[test]
    fn test_demo_is_deterministic() {
        let first = snapshot(7, PerformanceMonitor::disabled());
        let second = snapshot(7, PerformanceMonitor::disabled());
        assert_eq!(first, second);
        // A wave lands on the first tick.
        assert!(first.3 >= WAVE_SIZE as usize);
    }

    #[test]
    fn test_monitor_does_not_change_results() {
        let unmonitored = snapshot(7, PerformanceMonitor::disabled());
        let monitored = snapshot(7, PerformanceMonitor::new(0.1));
        assert_eq!(unmonitored, monitored);
    }
}
