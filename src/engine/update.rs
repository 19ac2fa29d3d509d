//! Deferred (buffered) component updates.
//!
//! A buffered query records write intents instead of mutating live component
//! cells. Each intent is an [`UpdateRecord`] carrying the target entity, the
//! component type name (for diagnostics), a raw pointer to the live cell, the
//! owned replacement value, and a monomorphized applicator that performs the
//! write. Records accumulate in FIFO order and are drained by an explicit
//! apply call on the registry; if several records target the same cell, the
//! last one enqueued wins.
//!
//! The queue is shared between the registry and in-flight buffered views
//! through `Rc<RefCell<…>>`, so a view can append without borrowing the
//! registry.
//!
//! ## Pointer validity
//! Recorded cell pointers remain valid only while no structural mutation
//! (spawn, add, destroy) occurs between recording and apply. This is the same
//! invalidation contract queries operate under.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::component::ComponentName;
use crate::engine::types::EntityId;

/// Writes a replacement value into a live component cell.
///
/// `target` must point at an initialized `C`; `payload` must box a `C`.
/// Both are guaranteed by construction at the recording site, which carries
/// `C` statically.
pub(crate) type Applicator = unsafe fn(*mut u8, Box<dyn Any>);

/// Monomorphized applicator for component type `C`. Replaces the cell value,
/// dropping the previous one.
pub(crate) unsafe fn apply_replace<C: 'static>(target: *mut u8, payload: Box<dyn Any>) {
    let Ok(value) = payload.downcast::<C>() else {
        debug_assert!(false, "buffered update payload type drifted from its applicator");
        return;
    };
    let cell = target.cast::<C>();
    drop(unsafe { std::ptr::replace(cell, *value) });
}

/// One deferred write intent.
pub struct UpdateRecord {
    pub(crate) entity: EntityId,
    pub(crate) component: ComponentName,
    pub(crate) target: *mut u8,
    pub(crate) payload: Box<dyn Any>,
    pub(crate) apply: Applicator,
}

/// FIFO queue of pending update records.
#[derive(Default)]
pub(crate) struct UpdateQueue {
    records: Vec<UpdateRecord>,
}

impl UpdateQueue {
    pub(crate) fn push(&mut self, record: UpdateRecord) {
        self.records.push(record);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Applies every record in FIFO order, then leaves the queue empty.
    pub(crate) fn apply_all(&mut self) {
        for record in self.records.drain(..) {
            tracing::trace!(
                entity = record.entity,
                component = record.component,
                "applying buffered update"
            );
            unsafe { (record.apply)(record.target, record.payload) };
        }
    }

    /// Drops every record without applying it.
    pub(crate) fn discard_all(&mut self) {
        self.records.clear();
    }
}

/// Handle to the pending-update queue, shared with buffered views.
pub(crate) type SharedUpdateQueue = Rc<RefCell<UpdateQueue>>;
