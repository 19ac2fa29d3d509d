//! Archetype tables: row-aligned columnar storage for one component set.
//!
//! An [`Archetype`] groups every entity that carries exactly the same set of
//! component types. It owns one type-erased column per component type plus
//! the ordered sequence of entity identifiers; all rows at index `i` across
//! all columns belong to entity `entity_ids[i]`.
//!
//! ## Identity
//! An archetype is identified by the XOR-fold of its component name hashes.
//! The void archetype (hash `0`, no columns) is created at registry init and
//! never destroyed; every other archetype is created lazily the first time an
//! entity migrates into its component set.
//!
//! ## Invariants
//! - Every column has length equal to `entity_ids.len()` after every public
//!   operation returns.
//! - Entities are densely packed; removal uses swap-remove and reports which
//!   entity was relocated so the caller can patch its pointer.

use rustc_hash::FxHashMap;

use crate::engine::component::ComponentName;
use crate::engine::error::{ColumnError, RowOutOfBoundsError};
use crate::engine::storage::TypeErasedColumn;
use crate::engine::types::{ArchetypeHash, EntityId, Row};

/// Outcome of removing a row from an archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRemoval {
    /// The entity whose row was removed.
    pub removed: EntityId,

    /// The entity relocated into the vacated row, if the removed row was not
    /// the last one. Its pointer must be patched by the caller.
    pub swapped: Option<EntityId>,
}

/// Stores entities that share an identical component-type set.
///
/// ## Design
/// - Component data is stored column-major, keyed by canonical type name.
/// - Entities are densely packed using swap-remove semantics.
/// - The hash is fixed at construction and never changes.

pub struct Archetype {
    hash: ArchetypeHash,
    entity_ids: Vec<EntityId>,
    columns: FxHashMap<ComponentName, Box<dyn TypeErasedColumn>>,
}

impl Archetype {
    /// Creates an empty archetype with the given identity.
    pub fn new(hash: ArchetypeHash) -> Self {
        Self {
            hash,
            entity_ids: Vec::new(),
            columns: FxHashMap::default(),
        }
    }

    /// Identity of this archetype.
    #[inline]
    pub fn hash(&self) -> ArchetypeHash {
        self.hash
    }

    /// Number of entities stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.entity_ids.len()
    }

    /// Returns `true` if no entities are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
    }

    /// The stored entity identifiers, in row order.
    #[inline]
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }

    /// The entity occupying `row`, if any.
    #[inline]
    pub fn entity_at(&self, row: Row) -> Option<EntityId> {
        self.entity_ids.get(row).copied()
    }

    /// Returns `true` if a column exists for the named component type.
    #[inline]
    pub fn has_column(&self, name: ComponentName) -> bool {
        self.columns.contains_key(name)
    }

    /// Borrows the column for the named component type.
    #[inline]
    pub fn column(&self, name: ComponentName) -> Option<&dyn TypeErasedColumn> {
        self.columns.get(name).map(|column| column.as_ref())
    }

    /// Mutably borrows the column for the named component type.
    #[inline]
    pub fn column_mut(&mut self, name: ComponentName) -> Option<&mut (dyn TypeErasedColumn + 'static)> {
        self.columns.get_mut(name).map(|column| column.as_mut())
    }

    /// Inserts a column under the given name.
    ///
    /// ## Invariants
    /// Columns must be added only while the archetype is empty; inserting
    /// into a populated archetype would break row alignment.
    pub fn insert_column(&mut self, name: ComponentName, column: Box<dyn TypeErasedColumn>) {
        debug_assert!(self.entity_ids.is_empty(), "column added to populated archetype");
        debug_assert!(!self.columns.contains_key(name), "column {name} already present");
        self.columns.insert(name, column);
    }

    /// Iterates over `(name, column)` pairs in unspecified order.
    pub fn columns(&self) -> impl Iterator<Item = (ComponentName, &dyn TypeErasedColumn)> {
        self.columns.iter().map(|(name, column)| (*name, column.as_ref()))
    }

    /// Names of the component types stored here, in unspecified order.
    pub fn column_names(&self) -> impl Iterator<Item = ComponentName> + '_ {
        self.columns.keys().copied()
    }

    /// Number of component columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Appends an entity and returns its row index.
    ///
    /// The caller is expected to then write every column at the new row
    /// before the next public operation observes the archetype.
    pub fn push_entity(&mut self, entity: EntityId) -> Row {
        self.entity_ids.push(entity);
        self.entity_ids.len() - 1
    }

    /// Removes the most recently appended entity. Rollback helper for a
    /// migration that could not complete.
    pub(crate) fn pop_entity(&mut self) -> Option<EntityId> {
        self.entity_ids.pop()
    }

    /// Removes row `row`, dropping every stored component value, and reports
    /// which entity (if any) was swapped into the vacated row.
    pub fn swap_remove(&mut self, row: Row) -> Result<SwapRemoval, ColumnError> {
        self.remove_row(row, true)
    }

    /// Removes row `row` **without dropping** component values, for rows
    /// whose values have already been relocated into another archetype.
    pub fn swap_remove_forgotten(&mut self, row: Row) -> Result<SwapRemoval, ColumnError> {
        self.remove_row(row, false)
    }

    fn remove_row(&mut self, row: Row, drop_values: bool) -> Result<SwapRemoval, ColumnError> {
        if row >= self.entity_ids.len() {
            return Err(RowOutOfBoundsError { row, length: self.entity_ids.len() }.into());
        }

        let last = self.entity_ids.len() - 1;
        let removed = self.entity_ids.swap_remove(row);
        let swapped = (row != last).then(|| self.entity_ids[row]);

        for column in self.columns.values_mut() {
            if drop_values {
                column.swap_remove(row)?;
            } else {
                column.swap_remove_forget(row)?;
            }
        }

        Ok(SwapRemoval { removed, swapped })
    }
}
