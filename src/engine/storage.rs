//! Type-erased columnar component storage.
//!
//! A [`Column<C>`] owns the densely packed values of one component type for
//! one archetype, indexed by row. Columns are stored in heterogeneous maps
//! behind the [`TypeErasedColumn`] trait object; the concrete element type is
//! recovered by `Any` downcast only at sites that carry `C` as a static type
//! parameter.
//!
//! ## Density
//! Rows are kept dense with swap-remove semantics: removing row `i` moves the
//! formerly-last row into `i`. Two removal flavors exist:
//!
//! * [`TypeErasedColumn::swap_remove`] drops the removed value, running its
//!   `Drop` implementation. Used when an entity is destroyed.
//! * [`TypeErasedColumn::swap_remove_forget`] releases the slot without
//!   dropping. Used after the value has been bitwise-relocated into another
//!   column during archetype migration; dropping it here would double-free.
//!
//! ## Unsafe code
//! Storage is `Vec<MaybeUninit<C>>` so rows can be relocated bitwise and so
//! [`Column::set`] can extend the column with uninitialized slots. Every slot
//! below the column length is assumed initialized except gap slots created by
//! `set`, which the caller must write before they are read, removed, or the
//! column is dropped. The engine itself only ever appends densely.

use std::any::{Any, TypeId};
use std::mem::MaybeUninit;

use crate::engine::component::{component_name, ComponentName};
use crate::engine::error::{ColumnError, RowOutOfBoundsError, TypeMismatchError};
use crate::engine::types::Row;

/// Virtual interface over one component column.
///
/// ## Purpose
/// Lets archetypes own and manipulate columns without naming their element
/// types. Operations that need the element type statically (writing a new
/// value, producing typed references) go through [`TypeErasedColumn::as_any_mut`]
/// and downcast to [`Column<C>`].
///
/// ## Invariants
/// - Row indices passed to removal and copy operations must be below the
///   column length; violations are reported, never ignored.
/// - [`TypeErasedColumn::copy_row_to`] requires source and destination to
///   share an element type.

pub trait TypeErasedColumn: Any {
    /// Number of rows currently stored.
    fn len(&self) -> usize;

    /// Returns `true` if the column holds no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runtime type of the element.
    fn element_type_id(&self) -> TypeId;

    /// Canonical name of the element type.
    fn element_type_name(&self) -> ComponentName;

    /// Upcast for typed downcasting at sites that know the element type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Allocates a fresh, empty column of the same element type.
    fn clone_empty(&self) -> Box<dyn TypeErasedColumn>;

    /// Removes row `row`, dropping the stored value, and moves the
    /// formerly-last row into its place.
    ///
    /// Returns the index the filler row previously occupied, or `None` if
    /// `row` was the last row.
    fn swap_remove(&mut self, row: Row) -> Result<Option<Row>, ColumnError>;

    /// Removes row `row` **without dropping** the stored value and moves the
    /// formerly-last row into its place.
    ///
    /// The slot must have been relocated (bitwise-copied out) beforehand.
    fn swap_remove_forget(&mut self, row: Row) -> Result<Option<Row>, ColumnError>;

    /// Appends a bitwise copy of row `source_row` to `destination` and
    /// returns the destination row index.
    ///
    /// The source value is left logically live; the caller must free the
    /// source row with [`TypeErasedColumn::swap_remove_forget`] afterwards so
    /// exactly one copy survives.
    fn copy_row_to(
        &self,
        source_row: Row,
        destination: &mut dyn TypeErasedColumn,
    ) -> Result<Row, ColumnError>;

    /// Raw pointer to the value at `row`, or `None` if out of bounds.
    fn row_ptr_mut(&mut self, row: Row) -> Option<*mut u8>;
}

/// Densely packed storage for values of one component type.
///
/// ## Invariants
/// - Slots in `[0, len)` are initialized, except gaps created by
///   [`Column::set`] that the caller has not yet written.
/// - `slots.len()` always equals the logical length.

pub struct Column<C> {
    slots: Vec<MaybeUninit<C>>,
}

impl<C> Default for Column<C> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<C: 'static> Column<C> {
    /// Creates an empty column.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn bounds_check(&self, row: Row) -> Result<(), ColumnError> {
        if row < self.slots.len() {
            Ok(())
        } else {
            Err(RowOutOfBoundsError { row, length: self.slots.len() }.into())
        }
    }

    /// Appends a value and returns its row index.
    pub fn push(&mut self, value: C) -> Row {
        self.slots.push(MaybeUninit::new(value));
        self.slots.len() - 1
    }

    /// Returns a reference to the value at `row`.
    pub fn get(&self, row: Row) -> Option<&C> {
        let slot = self.slots.get(row)?;
        // Rows below the length are initialized by the density invariant.
        Some(unsafe { slot.assume_init_ref() })
    }

    /// Returns a mutable reference to the value at `row`.
    pub fn get_mut(&mut self, row: Row) -> Option<&mut C> {
        let slot = self.slots.get_mut(row)?;
        Some(unsafe { slot.assume_init_mut() })
    }

    /// Replaces the slot at `row`, extending the column with uninitialized
    /// slots if `row` is at or past the current length.
    ///
    /// Replacing an existing row drops the previous value. When the column is
    /// extended, the caller is responsible for writing every gap slot before
    /// it is read, removed, or the column is dropped.
    pub fn set(&mut self, row: Row, value: C) {
        if row < self.slots.len() {
            let slot = &mut self.slots[row];
            unsafe { slot.assume_init_drop() };
            slot.write(value);
        } else {
            self.slots.resize_with(row + 1, MaybeUninit::uninit);
            self.slots[row].write(value);
        }
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the column holds no rows.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over the stored values in row order.
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.slots.iter().map(|slot| unsafe { slot.assume_init_ref() })
    }

    #[inline]
    fn swap_remove_slot(&mut self, row: Row) -> Result<(MaybeUninit<C>, Option<Row>), ColumnError> {
        self.bounds_check(row)?;
        let last = self.slots.len() - 1;
        let filled_from = (row != last).then_some(last);
        Ok((self.slots.swap_remove(row), filled_from))
    }
}

impl<C: 'static> TypeErasedColumn for Column<C> {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn element_type_id(&self) -> TypeId {
        TypeId::of::<C>()
    }

    fn element_type_name(&self) -> ComponentName {
        component_name::<C>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_empty(&self) -> Box<dyn TypeErasedColumn> {
        Box::new(Column::<C>::default())
    }

    fn swap_remove(&mut self, row: Row) -> Result<Option<Row>, ColumnError> {
        let (removed, filled_from) = self.swap_remove_slot(row)?;
        drop(unsafe { removed.assume_init() });
        Ok(filled_from)
    }

    fn swap_remove_forget(&mut self, row: Row) -> Result<Option<Row>, ColumnError> {
        let (_relocated, filled_from) = self.swap_remove_slot(row)?;
        Ok(filled_from)
    }

    fn copy_row_to(
        &self,
        source_row: Row,
        destination: &mut dyn TypeErasedColumn,
    ) -> Result<Row, ColumnError> {
        self.bounds_check(source_row)?;

        let actual = destination.element_type_name();
        let destination = destination
            .as_any_mut()
            .downcast_mut::<Column<C>>()
            .ok_or(TypeMismatchError { expected: component_name::<C>(), actual })?;

        // Bitwise duplicate; the source row stays logically live until it is
        // released with swap_remove_forget.
        let value = unsafe { std::ptr::read(self.slots[source_row].as_ptr()) };
        Ok(destination.push(value))
    }

    fn row_ptr_mut(&mut self, row: Row) -> Option<*mut u8> {
        let slot = self.slots.get_mut(row)?;
        Some(slot.as_mut_ptr().cast())
    }
}

impl<C> Drop for Column<C> {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            unsafe { slot.assume_init_drop() };
        }
    }
}
