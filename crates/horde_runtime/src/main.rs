//! Horde Runtime
//!
//! Headless binary that boots the arena demo on a virtual host and reports
//! simulation metrics.
//!
//! Usage: `horde [settings.json] [frames]`

mod demo;

use anyhow::{Context, Result};
use demo::GameActor;
use horde_core::{FrameView, Renderer, VirtualClock};
use horde_metrics::{phase, FrameTimer};
use horde_services::Settings;
use tracing_subscriber::EnvFilter;

const DEFAULT_FRAMES: usize = 1200;
const HOST_FRAME_MS: f64 = 1000.0 / 60.0;
/// One long host hitch mid-run, to exercise the catch-up clamp
const STALL_MS: f64 = 250.0;
const REPORT_EVERY: u64 = 300;

/// Stands in for a real renderer: tracks host frame pacing and logs a
/// summary every few hundred frames.
struct StatsRenderer {
    frame_timer: FrameTimer,
    frames: u64,
}

impl StatsRenderer {
    fn new() -> Self {
        Self {
            frame_timer: FrameTimer::new(120),
            frames: 0,
        }
    }
}

impl Renderer<GameActor> for StatsRenderer {
    fn render(&mut self, view: &FrameView<'_, GameActor>) {
        if let Some(now_ms) = view.clock().last_host_time() {
            self.frame_timer.record_host_time(now_ms);
        }
        self.frames += 1;
        if !self.frames.is_multiple_of(REPORT_EVERY) {
            return;
        }

        let monitor = view.monitor();
        let (min_ms, max_ms) = self.frame_timer.frame_time_range_ms();
        let frame_ms = self.frame_timer.frame_time_ms();
        tracing::info!(
            frame = self.frames,
            tick = view.clock().tick_count(),
            entities = view.registries().total_entries(),
            particles = view.particles().active_len(),
            particles_dropped = view.particles().dropped(),
            fps = format_args!("{:.1}", self.frame_timer.fps()),
            frame_ms = format_args!("{frame_ms:.2} [{min_ms:.2}, {max_ms:.2}]"),
            tick_ms = format_args!("{:.3}", monitor.average_ms(phase::TICK)),
            index_ms = format_args!("{:.3}", monitor.average_ms(phase::INDEX_REBUILD)),
            compaction_ms = format_args!("{:.3}", monitor.average_ms(phase::COMPACTION)),
            "simulation stats"
        );
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Horde v{}", horde_core::VERSION);

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("loading settings from {path}"))?,
        None => Settings::default(),
    };
    let frames = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid frame count '{raw}'"))?,
        None => DEFAULT_FRAMES,
    };

    let config = settings.simulation_config()?;
    let monitor = settings.performance_monitor();
    let (mut scheduler, _layers) = demo::build(config, monitor, settings.particles.seed)?;
    tracing::info!(
        tick_rate_hz = settings.simulation.tick_rate_hz,
        max_catch_up_ticks = settings.simulation.max_catch_up_ticks,
        cell_size = settings.spatial.cell_size,
        particle_capacity = settings.particles.capacity,
        "arena ready"
    );

    let mut host = VirtualClock::fixed(0.0, HOST_FRAME_MS, frames);
    host.set_delta(frames / 2, STALL_MS);
    let mut renderer = StatsRenderer::new();

    let summary = scheduler.run(&mut host, &mut renderer)?;

    let context = scheduler.context();
    for (_, registry) in context.registries().iter() {
        tracing::info!(registry = registry.name(), entries = registry.len(), "final registry size");
    }
    tracing::info!(
        frames = summary.frames,
        ticks = summary.ticks,
        clamped_frames = summary.clamped_frames,
        max_ticks_in_frame = summary.max_ticks_in_frame,
        simulated_s = format_args!("{:.2}", context.clock().simulated_ms() / 1000.0),
        particles_dropped = context.particles().dropped(),
        "run complete"
    );

    Ok(())
}
