//! Per-tick spatial acceleration structures.
//!
//! The index is rebuilt wholesale from the authoritative registries once per
//! fixed tick, after that tick's updates, and is read-only in between.

mod spatial_hash;

pub use spatial_hash::{
    GridEntry, SpatialHashConfig, SpatialHashConfigError, SpatialHashGrid, DEFAULT_CELL_SIZE,
};

use glam::Vec2;

/// Position contract for anything the spatial index can hold.
pub trait Positioned {
    /// World position, or `None` for entries that take no part in proximity queries.
    fn position(&self) -> Option<Vec2>;
}
