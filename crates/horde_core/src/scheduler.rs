//! Frame-driven fixed-step scheduler
//!
//! One host frame in, zero or more fixed ticks out, then exactly one render.
//! The clock bounds how many ticks a single frame can trigger, so a stall
//! degrades into slow motion instead of an ever-growing backlog.

use crate::context::{Actor, SimulationContext};
use crate::host::HostYield;
use crate::pool::ParticlePool;
use crate::query::SpatialHashGrid;
use crate::registry::Registries;
use crate::time::SimulationClock;
use horde_metrics::{phase, PerformanceMonitor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("update hook failed for '{registry}' slot {slot}")]
    UpdateHook {
        registry: &'static str,
        slot: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("scheduler halted after an earlier update failure")]
    Halted,
}

/// Read-only snapshot handed to the renderer once per host frame.
pub struct FrameView<'a, A> {
    context: &'a SimulationContext<A>,
}

impl<'a, A> FrameView<'a, A> {
    pub fn registries(&self) -> &'a Registries<A> {
        self.context.registries()
    }

    pub fn particles(&self) -> &'a ParticlePool {
        self.context.particles()
    }

    pub fn clock(&self) -> &'a SimulationClock {
        self.context.clock()
    }

    pub fn index(&self) -> &'a SpatialHashGrid {
        self.context.index()
    }

    pub fn monitor(&self) -> &'a PerformanceMonitor {
        self.context.monitor()
    }
}

pub trait Renderer<A> {
    fn render(&mut self, view: &FrameView<'_, A>);
}

/// Headless runs draw nothing.
impl<A> Renderer<A> for () {
    fn render(&mut self, _view: &FrameView<'_, A>) {}
}

impl<A, F> Renderer<A> for F
where
    F: FnMut(&FrameView<'_, A>),
{
    fn render(&mut self, view: &FrameView<'_, A>) {
        self(view)
    }
}

/// What one host frame did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub ticks: u32,
    /// Entries compacted across this frame's ticks
    pub removed: usize,
    /// Accumulator left over after draining ticks
    pub accumulator_ms: f64,
    /// The accumulator cap discarded time this frame
    pub clamped: bool,
    pub paused: bool,
}

/// Totals over a [`Scheduler::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub ticks: u64,
    pub clamped_frames: u64,
    pub max_ticks_in_frame: u32,
}

pub struct Scheduler<A> {
    context: SimulationContext<A>,
    paused: bool,
    halted: bool,
}

impl<A: Actor> Scheduler<A> {
    pub fn new(context: SimulationContext<A>) -> Self {
        Self {
            context,
            paused: false,
            halted: false,
        }
    }

    /// Advance the simulation for one host frame at `now_ms`, then render.
    ///
    /// A failing update hook halts the scheduler: the error is returned here
    /// and every later call returns [`SchedulerError::Halted`].
    pub fn on_host_frame<R>(
        &mut self,
        now_ms: f64,
        renderer: &mut R,
    ) -> Result<FrameReport, SchedulerError>
    where
        R: Renderer<A>,
    {
        if self.halted {
            return Err(SchedulerError::Halted);
        }

        let frame_started = self.context.monitor().start();
        let delta = self.context.clock.advance_host(now_ms);
        let mut report = FrameReport {
            paused: self.paused,
            ..FrameReport::default()
        };

        if !self.paused {
            report.clamped = self.context.clock.accumulate(delta);
            if report.clamped {
                tracing::debug!(
                    delta_ms = delta,
                    max_accumulator_ms = self.context.clock.config().max_accumulator_ms(),
                    "frame delta clamped"
                );
            }

            while self.context.clock.tick_ready() {
                match self.context.run_tick() {
                    Ok(removed) => report.removed += removed,
                    Err(err) => {
                        self.halted = true;
                        tracing::error!(
                            error = %err,
                            tick = self.context.tick_count(),
                            "halting scheduler"
                        );
                        return Err(err);
                    }
                }
                self.context.clock.complete_tick();
                report.ticks += 1;
            }
        }

        let render_started = self.context.monitor().start();
        renderer.render(&FrameView {
            context: &self.context,
        });
        let monitor = self.context.monitor_mut();
        monitor.stop(phase::RENDER, render_started);
        monitor.stop(phase::FRAME, frame_started);

        report.accumulator_ms = self.context.clock.accumulator_ms();
        Ok(report)
    }

    /// Drive frames from `host` until it runs out or a hook fails.
    pub fn run<H, R>(
        &mut self,
        host: &mut H,
        renderer: &mut R,
    ) -> Result<RunSummary, SchedulerError>
    where
        H: HostYield,
        R: Renderer<A>,
    {
        tracing::info!(
            fixed_dt_ms = self.context.clock().fixed_dt_ms(),
            max_ticks_per_frame = self.context.clock().config().max_ticks_per_frame(),
            "scheduler started"
        );

        let mut summary = RunSummary::default();
        while let Some(now_ms) = host.next_frame() {
            let report = self.on_host_frame(now_ms, renderer)?;
            summary.frames += 1;
            summary.ticks += u64::from(report.ticks);
            summary.clamped_frames += u64::from(report.clamped);
            summary.max_ticks_in_frame = summary.max_ticks_in_frame.max(report.ticks);
        }

        tracing::info!(
            frames = summary.frames,
            ticks = summary.ticks,
            clamped_frames = summary.clamped_frames,
            "scheduler stopped"
        );
        Ok(summary)
    }
}

impl<A> Scheduler<A> {
    /// Stop ticking. Frames keep rendering.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            tracing::debug!(tick = self.context.tick_count(), "paused");
        }
    }

    /// Resume ticking from a zero accumulator and a fresh host timestamp.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.context.clock.resync();
            tracing::debug!(tick = self.context.tick_count(), "resumed");
        }
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Restart the run. Clears pause and halt along with all simulation state.
    pub fn reset(&mut self) {
        self.paused = false;
        self.halted = false;
        self.context.reset();
    }

    pub fn context(&self) -> &SimulationContext<A> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SimulationContext<A> {
        &mut self.context
    }
}
