//! Registry-scoped resources.
//!
//! Resources are globally scoped data keyed by Rust type. Each registered
//! resource type has one of two shapes:
//!
//! * **Singleton** — at most one value (an optional cell); pushing replaces
//!   the previous value.
//! * **Collection** — an ordered sequence of values; pushing appends.
//!
//! A resource type must be registered with its kind before any push, query,
//! clear, or remove operation; the kind is immutable for the registry's
//! lifetime. Stored values are torn down by `Drop` whenever they are
//! replaced, removed, cleared, or the registry is dropped.

use std::any::{Any, TypeId};
use std::marker::PhantomData;

use rustc_hash::FxHashMap;

use crate::engine::error::ResourceError;

/// Storage shape of a registered resource type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// At most one value.
    Singleton,

    /// An ordered sequence of values.
    Collection,
}

enum ResourceStore {
    Singleton(Option<Box<dyn Any>>),
    Collection(Vec<Box<dyn Any>>),
}

struct ResourceEntry {
    kind: ResourceKind,
    store: ResourceStore,
}

/// Result of querying a registered resource type.
pub enum ResourceQuery<'a, R: 'static> {
    /// Borrowing handle to the singleton cell; `None` while the cell is empty.
    Singleton(Option<&'a mut R>),

    /// Snapshotting iterator over the collection's values.
    Collection(ResourceIter<'a, R>),
}

/// Iterator over the values of a collection resource.
///
/// The element pointers are snapshotted at query time; the iterator keeps the
/// registry mutably borrowed so no resource mutation can invalidate them
/// while it is alive.
pub struct ResourceIter<'a, R: 'static> {
    items: std::vec::IntoIter<*mut R>,
    _store: PhantomData<&'a mut R>,
}

impl<'a, R: 'static> ResourceIter<'a, R> {
    fn new(items: Vec<*mut R>) -> Self {
        Self { items: items.into_iter(), _store: PhantomData }
    }

    /// Number of values not yet yielded.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if every value has been yielded.
    pub fn is_empty(&self) -> bool {
        self.items.len() == 0
    }
}

impl<'a, R: 'static> Iterator for ResourceIter<'a, R> {
    type Item = &'a mut R;

    fn next(&mut self) -> Option<Self::Item> {
        // Each pointer addresses a distinct boxed value, so handing out
        // disjoint mutable references is sound while the registry borrow
        // held by `'a` is alive.
        self.items.next().map(|ptr| unsafe { &mut *ptr })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<'a, R: 'static> ExactSizeIterator for ResourceIter<'a, R> {}

/// Owns every registered resource.
#[derive(Default)]
pub(crate) struct Resources {
    entries: FxHashMap<TypeId, ResourceEntry>,
}

impl Resources {
    fn entry_mut<R: 'static>(&mut self) -> Result<&mut ResourceEntry, ResourceError> {
        self.entries
            .get_mut(&TypeId::of::<R>())
            .ok_or(ResourceError::NotRegistered { resource: std::any::type_name::<R>() })
    }

    /// Records the kind for resource type `R`.
    pub(crate) fn register<R: 'static>(&mut self, kind: ResourceKind) -> Result<(), ResourceError> {
        let type_id = TypeId::of::<R>();
        if self.entries.contains_key(&type_id) {
            return Err(ResourceError::AlreadyRegistered { resource: std::any::type_name::<R>() });
        }

        let store = match kind {
            ResourceKind::Singleton => ResourceStore::Singleton(None),
            ResourceKind::Collection => ResourceStore::Collection(Vec::new()),
        };
        self.entries.insert(type_id, ResourceEntry { kind, store });
        Ok(())
    }

    /// Returns `true` if `R` has been registered.
    pub(crate) fn registered<R: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<R>())
    }

    /// Returns the registered kind of `R`, if any.
    pub(crate) fn kind_of<R: 'static>(&self) -> Option<ResourceKind> {
        self.entries.get(&TypeId::of::<R>()).map(|entry| entry.kind)
    }

    /// Stores a value: replaces the singleton cell (dropping the previous
    /// value) or appends to the collection.
    pub(crate) fn push<R: 'static>(&mut self, value: R) -> Result<(), ResourceError> {
        let entry = self.entry_mut::<R>()?;
        match &mut entry.store {
            ResourceStore::Singleton(cell) => {
                *cell = Some(Box::new(value));
            }
            ResourceStore::Collection(items) => {
                items.push(Box::new(value));
            }
        }
        Ok(())
    }

    /// Produces the query variant matching `R`'s registered kind.
    pub(crate) fn query<R: 'static>(&mut self) -> Result<ResourceQuery<'_, R>, ResourceError> {
        let entry = self.entry_mut::<R>()?;
        match &mut entry.store {
            ResourceStore::Singleton(cell) => Ok(ResourceQuery::Singleton(
                cell.as_mut().and_then(|boxed| boxed.downcast_mut::<R>()),
            )),
            ResourceStore::Collection(items) => {
                // Every stored box holds an R; push is the only writer.
                let snapshot: Vec<*mut R> = items
                    .iter_mut()
                    .filter_map(|item| item.downcast_mut::<R>().map(|value| value as *mut R))
                    .collect();
                Ok(ResourceQuery::Collection(ResourceIter::new(snapshot)))
            }
        }
    }

    /// Drops every stored value of `R`.
    pub(crate) fn clear<R: 'static>(&mut self) -> Result<(), ResourceError> {
        let entry = self.entry_mut::<R>()?;
        match &mut entry.store {
            ResourceStore::Singleton(cell) => {
                *cell = None;
            }
            ResourceStore::Collection(items) => {
                items.clear();
            }
        }
        Ok(())
    }

    /// Removes one stored value of `R`: the singleton variant drops the cell
    /// (ignoring `index`); the collection variant removes at `index` with
    /// ordered semantics, preserving the relative order of later values.
    pub(crate) fn remove<R: 'static>(&mut self, index: usize) -> Result<(), ResourceError> {
        let entry = self.entry_mut::<R>()?;
        match &mut entry.store {
            ResourceStore::Singleton(cell) => {
                *cell = None;
                Ok(())
            }
            ResourceStore::Collection(items) => {
                if index >= items.len() {
                    return Err(ResourceError::IndexOutOfBounds { index, length: items.len() });
                }
                items.remove(index);
                Ok(())
            }
        }
    }
}
