//! Horde Core
//!
//! Frame-driven simulation core for 2D arena games with hundreds of
//! concurrent short-lived entities:
//! - Fixed-step clock with a bounded catch-up budget
//! - Named entity registries with in-place compaction
//! - Uniform-grid spatial index rebuilt every tick
//! - Pre-allocated particle pool
//! - Scheduler tying them together behind a host frame source

pub mod context;
pub mod host;
pub mod lifecycle;
pub mod math;
pub mod pool;
pub mod query;
pub mod registry;
pub mod scheduler;
pub mod time;

pub use glam;

pub use context::{Actor, SimulationConfig, SimulationContext, TickContext};
pub use host::{HostYield, RealTimeHost, VirtualClock};
pub use lifecycle::{compact, Cooldown, Lifecycle, Liveness};
pub use registry::{ActorRef, Registries, Registry, RegistryError, RegistryId};
pub use scheduler::{FrameReport, FrameView, Renderer, RunSummary, Scheduler, SchedulerError};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
