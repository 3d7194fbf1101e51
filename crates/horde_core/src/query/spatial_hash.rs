//! Spatial hash grid for position-based queries.
//!
//! Uses a uniform grid to find entities near a point without scanning every
//! entity. Cell coordinates are packed into a single `u64` key. Buckets are
//! truncated rather than freed on rebuild, so a steady population stops
//! allocating after the first few ticks.

use super::Positioned;
use crate::lifecycle::Lifecycle;
use crate::registry::{ActorRef, RegistryId};
use glam::Vec2;
use std::collections::HashMap;
use thiserror::Error;

/// Default cell size in world units, close to the typical query radius.
pub const DEFAULT_CELL_SIZE: f32 = 120.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpatialHashConfigError {
    #[error("cell size must be finite and positive, got {0}")]
    InvalidCellSize(f32),
}

/// Configuration for spatial hash grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialHashConfig {
    cell_size: f32,
}

impl SpatialHashConfig {
    pub fn new(cell_size: f32) -> Result<Self, SpatialHashConfigError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(SpatialHashConfigError::InvalidCellSize(cell_size));
        }
        Ok(Self { cell_size })
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

impl Default for SpatialHashConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

/// Entry in the spatial hash grid.
///
/// `pos` is a copy taken at build time, so visitors can do their precise
/// distance check without touching the registries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEntry {
    pub actor: ActorRef,
    pub pos: Vec2,
}

#[inline]
fn pack(cx: i32, cy: i32) -> u64 {
    ((cx as u32 as u64) << 32) | (cy as u32 as u64)
}

#[inline]
fn unpack(key: u64) -> (i32, i32) {
    ((key >> 32) as u32 as i32, key as u32 as i32)
}

/// Spatial hash grid accelerator.
pub struct SpatialHashGrid {
    config: SpatialHashConfig,
    /// Map from packed cell coordinates to entities in that cell.
    cells: HashMap<u64, Vec<GridEntry>>,
    /// Keys of the non-empty buckets, in first-insert order.
    occupied: Vec<u64>,
    len: usize,
}

impl SpatialHashGrid {
    /// Create a new spatial hash grid.
    pub fn new(config: SpatialHashConfig) -> Self {
        Self {
            config,
            cells: HashMap::new(),
            occupied: Vec::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.config.cell_size
    }

    /// Number of indexed entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets currently holding at least one entry.
    pub fn occupied_buckets(&self) -> usize {
        self.occupied.len()
    }

    /// Truncate every bucket, keeping the allocations.
    ///
    /// Keys are never evicted, so the map holds one bucket per cell ever
    /// occupied. Actors confined to an arena bound this by the arena area over
    /// `cell_size` squared.
    pub fn clear(&mut self) {
        for key in self.occupied.drain(..) {
            if let Some(bucket) = self.cells.get_mut(&key) {
                bucket.clear();
            }
        }
        self.len = 0;
    }

    /// Rebuild the grid from one registry's entries.
    pub fn build<T>(&mut self, registry: RegistryId, entries: &[T])
    where
        T: Lifecycle + Positioned,
    {
        self.clear();
        self.insert_registry(registry, entries);
    }

    /// Add one registry's live entries without clearing.
    ///
    /// Slots count live entries only, so they match each entry's position
    /// once the registry has been compacted.
    pub fn insert_registry<T>(&mut self, registry: RegistryId, entries: &[T])
    where
        T: Lifecycle + Positioned,
    {
        let mut slot = 0u32;
        for entry in entries {
            if !entry.is_alive() {
                continue;
            }
            if let Some(pos) = entry.position() {
                self.insert(ActorRef { registry, slot }, pos);
            }
            slot += 1;
        }
    }

    /// Insert a single entry. Non-finite positions are skipped.
    pub fn insert(&mut self, actor: ActorRef, pos: Vec2) {
        if !pos.is_finite() {
            return;
        }
        let key = pack(self.cell_of(pos.x), self.cell_of(pos.y));
        let bucket = self.cells.entry(key).or_default();
        if bucket.is_empty() {
            self.occupied.push(key);
        }
        bucket.push(GridEntry { actor, pos });
        self.len += 1;
    }

    /// Visit every entry in the cells overlapping the circle at `(x, y)`.
    ///
    /// Candidates are a superset of the true neighbourhood; callers do the
    /// precise check. The visitor returns `false` to stop early. Returns
    /// whether the traversal ran to completion.
    pub fn for_each_near<F>(&self, x: f32, y: f32, radius: f32, mut visitor: F) -> bool
    where
        F: FnMut(&GridEntry) -> bool,
    {
        if self.len == 0 || !x.is_finite() || !y.is_finite() {
            return true;
        }
        // NaN and negative radii collapse to the query cell
        let radius = if radius > 0.0 { radius } else { 0.0 };

        let min_x = self.cell_of(x - radius);
        let max_x = self.cell_of(x + radius);
        let min_y = self.cell_of(y - radius);
        let max_y = self.cell_of(y + radius);

        let span_x = max_x as i64 - min_x as i64 + 1;
        let span_y = max_y as i64 - min_y as i64 + 1;
        let span = span_x.checked_mul(span_y).unwrap_or(i64::MAX);

        if span > self.occupied.len() as i64 {
            // Rectangle covers more cells than exist: walk the occupied ones
            for &key in &self.occupied {
                let (cx, cy) = unpack(key);
                if cx < min_x || cx > max_x || cy < min_y || cy > max_y {
                    continue;
                }
                if !self.visit_bucket(key, &mut visitor) {
                    return false;
                }
            }
            return true;
        }

        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                if !self.visit_bucket(pack(cx, cy), &mut visitor) {
                    return false;
                }
            }
        }
        true
    }

    /// Push entries within `radius` of `(x, y)` (exact check) into `out`.
    /// Returns how many were pushed.
    pub fn query_radius(&self, x: f32, y: f32, radius: f32, out: &mut Vec<GridEntry>) -> usize {
        let center = Vec2::new(x, y);
        let radius_squared = radius * radius;
        let before = out.len();
        self.for_each_near(x, y, radius, |entry| {
            if entry.pos.distance_squared(center) <= radius_squared {
                out.push(*entry);
            }
            true
        });
        out.len() - before
    }

    /// First entry within `radius` accepted by `filter`, stopping the scan there.
    pub fn find_within<F>(&self, x: f32, y: f32, radius: f32, mut filter: F) -> Option<GridEntry>
    where
        F: FnMut(&GridEntry) -> bool,
    {
        let center = Vec2::new(x, y);
        let radius_squared = radius * radius;
        let mut found = None;
        self.for_each_near(x, y, radius, |entry| {
            if entry.pos.distance_squared(center) <= radius_squared && filter(entry) {
                found = Some(*entry);
                return false;
            }
            true
        });
        found
    }

    /// Closest entry within `max_radius` accepted by `filter`.
    pub fn nearest<F>(&self, x: f32, y: f32, max_radius: f32, mut filter: F) -> Option<GridEntry>
    where
        F: FnMut(&GridEntry) -> bool,
    {
        let center = Vec2::new(x, y);
        let mut best: Option<(f32, GridEntry)> = None;
        let mut best_distance = max_radius * max_radius;
        self.for_each_near(x, y, max_radius, |entry| {
            let distance = entry.pos.distance_squared(center);
            if distance <= best_distance && filter(entry) {
                let closer = best.is_none_or(|(d, _)| distance < d);
                if closer {
                    best_distance = distance;
                    best = Some((distance, *entry));
                }
            }
            true
        });
        best.map(|(_, entry)| entry)
    }

    #[inline]
    fn cell_of(&self, v: f32) -> i32 {
        (v / self.config.cell_size).floor() as i32
    }

    #[inline]
    fn visit_bucket<F>(&self, key: u64, visitor: &mut F) -> bool
    where
        F: FnMut(&GridEntry) -> bool,
    {
        match self.cells.get(&key) {
            Some(bucket) => bucket.iter().all(|entry| visitor(entry)),
            None => true,
        }
    }
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::new(SpatialHashConfig::default())
    }
}
