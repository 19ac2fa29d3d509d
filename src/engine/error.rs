//! Error types for entity storage, queries, resources, and the pipeline.
//!
//! This module declares focused, composable error types used across the
//! archetype storage engine and the execution pipeline. Each error carries
//! enough context to make failures actionable while remaining small and cheap
//! to pass around or convert into higher-level variants like [`EcsError`].
//!
//! ## Goals
//! * **Specificity:** Each error type models a single failure mode (e.g. a
//!   dead entity handle, a duplicate component add, an out-of-bounds row).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`fmt::Display`], and provide `From<T>` conversions into aggregate
//!   errors.
//! * **Actionability:** Structured fields (offending entity, archetype hash,
//!   expected vs. actual types) make logs useful without reproducing the
//!   issue.
//!
//! ## Typical flow
//! Low-level column operations return [`ColumnError`]. Registry orchestration
//! code uses `?` to bubble failures into [`EcsError`], which callers can match
//! on for control flow or log with user-readable messages.
//!
//! ## Display vs. Debug
//! * [`fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

use crate::engine::types::{EntityId, Row};

/// Returned when a `(row, length)` pair addresses a column position outside
/// valid storage bounds.
///
/// ## Context
/// Used by column storage to report invalid addressing, typically caused by
/// stale metadata or incorrect index calculations.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOutOfBoundsError {
    /// Row index that was addressed.
    pub row: Row,

    /// Number of valid rows in the column.
    pub length: usize,
}

impl fmt::Display for RowOutOfBoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} out of bounds (column length {})", self.row, self.length)
    }
}

impl std::error::Error for RowOutOfBoundsError {}

/// Returned when a column operation targets storage whose element type does
/// not match the provided value's type.
///
/// This is a logic error surfaced by storage when component types diverge
/// (e.g. writing `Velocity` into a `Position` column).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatchError {
    /// Canonical name of the destination storage's declared element type.
    pub expected: &'static str,

    /// Canonical name of the provided value's type.
    pub actual: &'static str,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type mismatch: expected {}, actual {}", self.expected, self.actual)
    }
}

impl std::error::Error for TypeMismatchError {}

/// Aggregate error for component column operations.
///
/// Wraps the precise, low-level failures that can occur when reading, writing,
/// or relocating rows of component storage. Conversions (`From<T>`) are
/// implemented for the low-level errors so callers can write `?` and still
/// return a single, expressive type.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnError {
    /// A row index addressed storage outside valid bounds.
    OutOfBounds(RowOutOfBoundsError),

    /// The dynamic type of a value did not match the column element type.
    TypeMismatch(TypeMismatchError),
}

impl fmt::Display for ColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnError::OutOfBounds(e) => write!(f, "{e}"),
            ColumnError::TypeMismatch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ColumnError {}

impl From<RowOutOfBoundsError> for ColumnError {
    fn from(e: RowOutOfBoundsError) -> Self { ColumnError::OutOfBounds(e) }
}

impl From<TypeMismatchError> for ColumnError {
    fn from(e: TypeMismatchError) -> Self { ColumnError::TypeMismatch(e) }
}

/// Errors produced by resource registration and access.
///
/// ## Context
/// A resource must be registered with its kind before any push, query, clear,
/// or remove operation; the registered kind is immutable for the registry's
/// lifetime.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// A resource operation was attempted before registration.
    NotRegistered {
        /// Canonical name of the resource type.
        resource: &'static str,
    },

    /// The resource type was registered more than once.
    AlreadyRegistered {
        /// Canonical name of the resource type.
        resource: &'static str,
    },

    /// A collection removal addressed an index past the stored values.
    IndexOutOfBounds {
        /// Offending index.
        index: usize,

        /// Number of stored values.
        length: usize,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotRegistered { resource } => {
                write!(f, "resource {} is not registered", resource)
            }
            ResourceError::AlreadyRegistered { resource } => {
                write!(f, "resource {} is already registered", resource)
            }
            ResourceError::IndexOutOfBounds { index, length } => {
                write!(f, "resource index {} out of bounds (length {})", index, length)
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Structural errors produced by pipeline mutation.
///
/// These propagate out of pipeline-editing operations immediately; they are
/// never produced during execution.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A stage name collided with an existing stage at the same nesting level.
    DuplicateStage {
        /// Offending stage name.
        name: String,
    },

    /// A named stage was not found in the pipeline.
    StageNotFound {
        /// Requested stage name.
        name: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::DuplicateStage { name } => {
                write!(f, "stage {:?} already exists at this nesting level", name)
            }
            PipelineError::StageNotFound { name } => {
                write!(f, "stage {:?} not found", name)
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Opaque error produced by a user system's `process` implementation.
///
/// The engine does not interpret the inner error; it is logged by the pipeline
/// and either stops the current stage or is skipped, depending on the stage's
/// `continue_on_error` policy.

#[derive(Debug)]
pub struct SystemError {
    inner: Box<dyn std::error::Error + 'static>,
}

impl SystemError {
    /// Wraps an arbitrary error value.
    pub fn new(inner: impl std::error::Error + 'static) -> Self {
        Self { inner: Box::new(inner) }
    }

    /// Builds a system error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self { inner: Into::<String>::into(message).into() }
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for SystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl From<String> for SystemError {
    fn from(message: String) -> Self { Self::msg(message) }
}

impl From<&str> for SystemError {
    fn from(message: &str) -> Self { Self::msg(message) }
}

impl From<EcsError> for SystemError {
    fn from(error: EcsError) -> Self { Self::new(error) }
}

impl From<ResourceError> for SystemError {
    fn from(error: ResourceError) -> Self { Self::new(error) }
}

/// High-level error for registry operations.
///
/// This aggregates the failure modes encountered while creating entities,
/// migrating them between archetypes, querying components, and accessing
/// resources. It intentionally preserves the underlying structured error to
/// keep diagnostics actionable.
///
/// ### Usage
/// `From<T>` conversions allow `?` from low-level operations:
/// ```ignore
/// fn grow(registry: &mut Registry, entity: EntityId) -> Result<(), EcsError> {
///     registry.add_component(entity, Radius(2.0))?; // NoSuchEntity, DuplicateComponent, …
///     Ok(())
/// }
/// ```

#[derive(Debug)]
pub enum EcsError {
    /// An entity handle did not resolve to a live entity.
    NoSuchEntity {
        /// Offending entity identifier.
        entity: EntityId,
    },

    /// A runtime invariant violation was detected — for example an entity
    /// pointer referencing an archetype absent from the archetype map. The
    /// registry should be considered corrupted after observing this error.
    InternalInconsistency {
        /// Short description of the violated invariant.
        detail: &'static str,
    },

    /// A component was added to an entity that already carries a component of
    /// the same type. Adding it would collapse the archetype hash back onto
    /// the source archetype.
    DuplicateComponent {
        /// Canonical name of the offending component type.
        component: &'static str,
    },

    /// A query requested an unusable component set.
    InvalidQuery {
        /// Why the request was rejected.
        reason: &'static str,
    },

    /// The monotonic entity ID counter ran out of fresh identifiers.
    IdSpaceExhausted,

    /// A column-level storage operation failed.
    Column(ColumnError),

    /// A resource operation failed.
    Resource(ResourceError),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::NoSuchEntity { entity } => {
                write!(f, "entity {} does not exist", entity)
            }
            EcsError::InternalInconsistency { detail } => {
                write!(f, "internal inconsistency: {}", detail)
            }
            EcsError::DuplicateComponent { component } => {
                write!(f, "entity already has component {}", component)
            }
            EcsError::InvalidQuery { reason } => {
                write!(f, "invalid query: {}", reason)
            }
            EcsError::IdSpaceExhausted => {
                f.write_str("entity identifier space exhausted")
            }
            EcsError::Column(e) => write!(f, "{e}"),
            EcsError::Resource(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<ColumnError> for EcsError {
    fn from(e: ColumnError) -> Self { EcsError::Column(e) }
}

impl From<ResourceError> for EcsError {
    fn from(e: ResourceError) -> Self { EcsError::Resource(e) }
}

/// Convenience alias for registry-level results.
pub type EcsResult<T> = Result<T, EcsError>;
