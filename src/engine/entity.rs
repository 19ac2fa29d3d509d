//! Entity identity and location tracking.
//!
//! Entities are opaque numeric handles that reference rows in archetype
//! storage. This module is responsible for:
//!
//! - assigning stable, monotonically increasing entity identifiers,
//! - mapping entities to their archetype and row,
//! - detecting stale handles by lookup failure.
//!
//! Identifiers are never recycled: destroying an entity retires its ID for
//! the lifetime of the registry. When the 32-bit counter is exhausted, entity
//! creation fails with [`EcsError::IdSpaceExhausted`] rather than wrapping.

use rustc_hash::FxHashMap;

use crate::engine::error::EcsError;
use crate::engine::types::{ArchetypeHash, EntityId, Row};

/// Physical storage location of an entity.
///
/// ## Invariants
/// `entities[e] = (h, r)` implies `archetypes[h].entity_ids[r] = e`; the
/// pointer is updated atomically with every archetype row move.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityPointer {
    /// Archetype containing the entity.
    pub archetype: ArchetypeHash,

    /// Row index within the archetype's columns.
    pub row: Row,
}

/// Allocates entity identifiers and tracks entity locations.
#[derive(Default)]
pub struct EntityIndex {
    pointers: FxHashMap<EntityId, EntityPointer>,
    next_id: EntityId,
}

impl EntityIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    /// Returns `true` if no entities are alive.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Returns `true` if the entity is alive.
    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.pointers.contains_key(&entity)
    }

    /// Reserves the next fresh identifier and records its location.
    ///
    /// ## Errors
    /// `IdSpaceExhausted` once the 32-bit counter has been used up.
    pub fn allocate(&mut self, pointer: EntityPointer) -> Result<EntityId, EcsError> {
        let id = self.next_id;
        let next = id.checked_add(1).ok_or(EcsError::IdSpaceExhausted)?;
        self.pointers.insert(id, pointer);
        self.next_id = next;
        Ok(id)
    }

    /// Returns the location of an entity, if alive.
    #[inline]
    pub fn get(&self, entity: EntityId) -> Option<EntityPointer> {
        self.pointers.get(&entity).copied()
    }

    /// Updates the stored location for an entity.
    ///
    /// Returns `false` if the entity is not alive.
    pub fn set(&mut self, entity: EntityId, pointer: EntityPointer) -> bool {
        match self.pointers.get_mut(&entity) {
            Some(stored) => {
                *stored = pointer;
                true
            }
            None => false,
        }
    }

    /// Removes an entity from the index. Returns its last known location.
    pub fn remove(&mut self, entity: EntityId) -> Option<EntityPointer> {
        self.pointers.remove(&entity)
    }

    /// Iterates over `(entity, pointer)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, EntityPointer)> + '_ {
        self.pointers.iter().map(|(entity, pointer)| (*entity, *pointer))
    }
}
