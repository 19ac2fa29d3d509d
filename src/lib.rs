//! # Stratum ECS
//!
//! Archetype-based Entity-Component-System core with a staged execution
//! pipeline.
//!
//! ## Design Goals
//! - Archetype-based columnar storage for cache efficiency
//! - Stable, order-independent archetype identity (XOR name-hash folding)
//! - Deferred, atomically applied component updates
//! - Explicit, ordered system execution with per-stage gating
//!
//! ## Execution model
//! Single-threaded cooperative: every registry operation runs to completion
//! (or rolls back) on the caller's thread. The host creates a [`Registry`],
//! registers resources and systems into named pipeline stages, spawns
//! entities with component bundles, and drives frames by executing the
//! pipeline. Systems issue queries against the registry, mutate components
//! in place or queue buffered updates, and read and write resources.

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core storage types

pub use engine::registry::{Registry, RegistryConfig};

pub use engine::archetype::{Archetype, SwapRemoval};

pub use engine::entity::EntityPointer;

pub use engine::component::{
    component_hash,
    component_name,
    name_hash,
    ComponentBundle,
    ComponentInfo,
    ComponentSet,
};

pub use engine::storage::{Column, TypeErasedColumn};

// Queries and buffered updates

pub use engine::query::{BufferedQueryIter, BufferedView, EntityView, QueryIter};

// Resources and plugins

pub use engine::resource::{ResourceIter, ResourceKind, ResourceQuery};
pub use engine::plugin::Plugin;

// Pipeline and systems

pub use engine::pipeline::{Match, Pipeline, RunCondition, Stage, StageConfig};
pub use engine::systems::{FnSystem, System};

// Errors

pub use engine::error::{
    ColumnError,
    EcsError,
    EcsResult,
    PipelineError,
    ResourceError,
    RowOutOfBoundsError,
    SystemError,
    TypeMismatchError,
};

pub use engine::types::{ArchetypeHash, EntityId, Row, VOID_ARCHETYPE};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used ECS types.
///
/// Import with:
/// ```rust
/// use stratum_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        EcsError,
        EcsResult,
        EntityId,
        FnSystem,
        Match,
        Pipeline,
        Plugin,
        Registry,
        RegistryConfig,
        ResourceKind,
        ResourceQuery,
        StageConfig,
        System,
        SystemError,
    };
}
