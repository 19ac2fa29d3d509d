//! Core ECS identifiers and shared type aliases.
//!
//! This module defines the **fundamental identifiers** used throughout the
//! engine. These definitions form the semantic backbone of the system and are
//! shared across all subsystems, including entity management, archetypes,
//! queries, and the pipeline.
//!
//! ## Entity Representation
//!
//! Entities are plain 32-bit integers assigned from a monotonic counter.
//! Identifiers are **never recycled** for the lifetime of a registry: once an
//! entity is destroyed, its identifier stays dead. Stale handles are detected
//! by lookup failure rather than by versioning.
//!
//! ## Archetype Identity
//!
//! Archetypes are identified by a 64-bit hash obtained by XOR-folding the
//! hashed canonical names of their component types. XOR is commutative, so a
//! component set maps to the same hash regardless of the order in which the
//! components were added. The empty set folds to `0`, which is reserved for
//! the void archetype.

/// Identifier for an entity. Assigned monotonically; never recycled.
pub type EntityId = u32;

/// Identity of an archetype: the XOR-fold of its component name hashes.
pub type ArchetypeHash = u64;

/// Row index of an entity within its archetype's columns.
pub type Row = usize;

/// Hash of the always-present archetype holding entities with no components.
pub const VOID_ARCHETYPE: ArchetypeHash = 0;
