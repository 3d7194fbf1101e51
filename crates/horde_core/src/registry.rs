//! Named, ordered entity registries
//!
//! A registry exclusively owns its entries. Order is draw order; the
//! simulation only depends on it for determinism. Entries are only ever
//! appended, and only ever removed by compaction.

use crate::lifecycle::{self, Lifecycle};
use thiserror::Error;

/// Handle to one registry inside a [`Registries`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(u16);

impl RegistryId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Reference to an entry by registry and slot.
///
/// Slots are positions in the registry's entry list, so a reference is only
/// meaningful until the next compaction of that registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActorRef {
    pub registry: RegistryId,
    pub slot: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry '{name}' is already registered")]
    DuplicateName { name: &'static str },

    #[error("registry limit of {limit} reached")]
    TooManyRegistries { limit: usize },

    #[error("unknown registry id {0:?}")]
    UnknownRegistry(RegistryId),
}

#[derive(Debug, Clone)]
pub struct Registry<T> {
    name: &'static str,
    indexed: bool,
    entries: Vec<T>,
}

impl<T> Registry<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            indexed: false,
            entries: Vec::new(),
        }
    }

    /// Reserve room for `capacity` entries so early spawns don't reallocate.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.entries.reserve(capacity);
        self
    }

    /// Include this registry's entries in the per-tick spatial index.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn get(&self, slot: usize) -> Option<&T> {
        self.entries.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.entries.get_mut(slot)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.entries.iter_mut()
    }

    /// Drop every entry, keeping the allocation (run reset).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Lifecycle> Registry<T> {
    /// Remove finished entries in place. Returns the number removed.
    pub fn compact(&mut self) -> usize {
        lifecycle::compact(&mut self.entries, T::is_alive)
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_alive()).count()
    }
}

impl<'a, T> IntoIterator for &'a Registry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// The ordered set of registries of one simulation.
#[derive(Debug, Clone)]
pub struct Registries<T> {
    registries: Vec<Registry<T>>,
}

impl<T> Registries<T> {
    pub fn new() -> Self {
        Self {
            registries: Vec::new(),
        }
    }

    /// Add a registry. Update order follows registration order.
    pub fn register(&mut self, registry: Registry<T>) -> Result<RegistryId, RegistryError> {
        if self.registries.iter().any(|r| r.name == registry.name) {
            return Err(RegistryError::DuplicateName {
                name: registry.name,
            });
        }
        let limit = u16::MAX as usize + 1;
        if self.registries.len() >= limit {
            return Err(RegistryError::TooManyRegistries { limit });
        }
        let id = RegistryId(self.registries.len() as u16);
        self.registries.push(registry);
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Option<RegistryId> {
        self.registries
            .iter()
            .position(|r| r.name == name)
            .map(|idx| RegistryId(idx as u16))
    }

    pub fn get(&self, id: RegistryId) -> Result<&Registry<T>, RegistryError> {
        self.registries
            .get(id.index())
            .ok_or(RegistryError::UnknownRegistry(id))
    }

    pub fn get_mut(&mut self, id: RegistryId) -> Result<&mut Registry<T>, RegistryError> {
        self.registries
            .get_mut(id.index())
            .ok_or(RegistryError::UnknownRegistry(id))
    }

    /// Append an entry to a registry.
    pub fn push(&mut self, id: RegistryId, entry: T) -> Result<(), RegistryError> {
        self.get_mut(id)?.push(entry);
        Ok(())
    }

    pub fn resolve(&self, actor: ActorRef) -> Option<&T> {
        self.registries
            .get(actor.registry.index())?
            .get(actor.slot as usize)
    }

    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// Entries across all registries.
    pub fn total_entries(&self) -> usize {
        self.registries.iter().map(Registry::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RegistryId, &Registry<T>)> {
        self.registries
            .iter()
            .enumerate()
            .map(|(idx, r)| (RegistryId(idx as u16), r))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RegistryId, &mut Registry<T>)> {
        self.registries
            .iter_mut()
            .enumerate()
            .map(|(idx, r)| (RegistryId(idx as u16), r))
    }

    pub fn clear_all(&mut self) {
        for registry in &mut self.registries {
            registry.clear();
        }
    }
}

impl<T: Lifecycle> Registries<T> {
    /// Compact every registry. Returns the total number of entries removed.
    pub fn compact_all(&mut self) -> usize {
        self.registries.iter_mut().map(Registry::compact).sum()
    }
}

impl<T> Default for Registries<T> {
    fn default() -> Self {
        Self::new()
    }
}
