//! Query iteration over matched archetypes.
//!
//! A query names a tuple of component types and yields one view per entity
//! whose archetype carries a **superset** of those types. Matching happens at
//! construction: the registry walks every archetype, and for each matching
//! row snapshots `(entity, pointer-per-component)` into an owned view array.
//! The returned iterator drains that array.
//!
//! ## Lifetime discipline
//! The iterator owns its snapshot, so yielding a view never borrows archetype
//! storage — in-place mutation through a view cannot alias column growth.
//! Structural registry operations (spawn, add, destroy) would invalidate the
//! snapshot's row pointers, so the iterator and every view it yields carry a
//! phantom mutable borrow of the registry: the borrow checker rejects any
//! registry call while either is alive. Drop (or fully drain) the iterator
//! and its views to release the borrow.
//!
//! ## Buffered queries
//! [`BufferedView::write`] never touches the live cell. It boxes the new
//! value and appends an update record to the registry's pending queue; the
//! write lands when `apply_buffered_updates` drains the queue in FIFO order.

use std::any::TypeId;
use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::engine::component::ComponentName;
use crate::engine::error::{EcsError, EcsResult};
use crate::engine::registry::Registry;
use crate::engine::types::EntityId;
use crate::engine::update::{apply_replace, SharedUpdateQueue, UpdateRecord};

pub(crate) type ViewSlot = (TypeId, ComponentName, *mut u8);

/// One matched entity and the pointers to its queried components.
///
/// Component access is type-checked against the queried set at runtime;
/// requesting a type outside the set returns `None`. The `'w` lifetime pins
/// the registry borrow the view's pointers depend on.
pub struct EntityView<'w> {
    entity: EntityId,
    slots: SmallVec<[ViewSlot; 4]>,
    _registry: PhantomData<&'w mut Registry>,
}

impl<'w> EntityView<'w> {
    pub(crate) fn new(entity: EntityId, slots: SmallVec<[ViewSlot; 4]>) -> Self {
        Self { entity, slots, _registry: PhantomData }
    }

    /// The matched entity.
    #[inline]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    #[inline]
    fn slot<C: 'static>(&self) -> Option<*mut u8> {
        let wanted = TypeId::of::<C>();
        self.slots
            .iter()
            .find(|(type_id, _, _)| *type_id == wanted)
            .map(|(_, _, ptr)| *ptr)
    }

    /// Borrows the entity's `C` component, if `C` was part of the query.
    pub fn get<C: 'static>(&self) -> Option<&C> {
        self.slot::<C>().map(|ptr| unsafe { &*ptr.cast::<C>() })
    }

    /// Mutably borrows the entity's `C` component, if `C` was part of the
    /// query. Mutation happens in place.
    pub fn get_mut<C: 'static>(&mut self) -> Option<&mut C> {
        self.slot::<C>().map(|ptr| unsafe { &mut *ptr.cast::<C>() })
    }
}

/// Draining iterator over the entity views matched by a query.
///
/// Holds a phantom mutable borrow of the registry for its lifetime; see the
/// module docs for the mutation contract.
pub struct QueryIter<'w> {
    views: std::vec::IntoIter<EntityView<'w>>,
}

impl<'w> QueryIter<'w> {
    pub(crate) fn new(views: Vec<EntityView<'w>>) -> Self {
        Self { views: views.into_iter() }
    }

    /// Number of views not yet yielded.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns `true` if every view has been yielded.
    pub fn is_empty(&self) -> bool {
        self.views.len() == 0
    }
}

impl<'w> Iterator for QueryIter<'w> {
    type Item = EntityView<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        self.views.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.views.size_hint()
    }
}

impl<'w> ExactSizeIterator for QueryIter<'w> {}

/// One matched entity in a buffered query.
///
/// Reads go straight to the live cells; writes are recorded for deferred
/// application and leave the live cells untouched.
pub struct BufferedView<'w> {
    entity: EntityId,
    slots: SmallVec<[ViewSlot; 4]>,
    queue: SharedUpdateQueue,
    _registry: PhantomData<&'w mut Registry>,
}

impl<'w> BufferedView<'w> {
    pub(crate) fn new(
        entity: EntityId,
        slots: SmallVec<[ViewSlot; 4]>,
        queue: SharedUpdateQueue,
    ) -> Self {
        Self { entity, slots, queue, _registry: PhantomData }
    }

    /// The matched entity.
    #[inline]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    #[inline]
    fn slot<C: 'static>(&self) -> Option<&ViewSlot> {
        let wanted = TypeId::of::<C>();
        self.slots.iter().find(|(type_id, _, _)| *type_id == wanted)
    }

    /// Borrows the current (pre-apply) value of the entity's `C` component.
    pub fn read<C: 'static>(&self) -> Option<&C> {
        self.slot::<C>().map(|(_, _, ptr)| unsafe { &*ptr.cast::<C>() })
    }

    /// Queues `value` as a deferred replacement for the entity's `C`
    /// component. The live cell is not modified until the registry applies
    /// its buffered updates.
    ///
    /// ## Errors
    /// `InvalidQuery` if `C` was not part of the queried component set.
    pub fn write<C: 'static>(&self, value: C) -> EcsResult<()> {
        let &(_, name, target) = self
            .slot::<C>()
            .ok_or(EcsError::InvalidQuery { reason: "written component is not part of the query" })?;

        self.queue.borrow_mut().push(UpdateRecord {
            entity: self.entity,
            component: name,
            target,
            payload: Box::new(value),
            apply: apply_replace::<C>,
        });
        Ok(())
    }
}

/// Draining iterator over buffered views.
///
/// Carries the same phantom registry borrow as [`QueryIter`].
pub struct BufferedQueryIter<'w> {
    views: std::vec::IntoIter<BufferedView<'w>>,
}

impl<'w> BufferedQueryIter<'w> {
    pub(crate) fn new(views: Vec<BufferedView<'w>>) -> Self {
        Self { views: views.into_iter() }
    }

    /// Number of views not yet yielded.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns `true` if every view has been yielded.
    pub fn is_empty(&self) -> bool {
        self.views.len() == 0
    }
}

impl<'w> Iterator for BufferedQueryIter<'w> {
    type Item = BufferedView<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        self.views.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.views.size_hint()
    }
}

impl<'w> ExactSizeIterator for BufferedQueryIter<'w> {}
