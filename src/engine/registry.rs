//! The registry: owning container and orchestration layer of the ECS.
//!
//! The [`Registry`] owns all archetypes and their component storage, the
//! entity index, registered resources, plugins, the execution pipeline, and
//! the pending buffered-update queue. It exposes entity lifecycle, component
//! add, query, resource, and buffered-update operations.
//!
//! ## Migration protocol
//! Adding a component to an entity moves its row from the source archetype to
//! the target archetype identified by `source_hash XOR component_hash`:
//!
//! 1. Reject the add if the entity already carries the component (a second
//!    add would XOR the contribution back out and collapse the hash onto the
//!    source archetype).
//! 2. Lazily materialize the target archetype by cloning an empty column for
//!    every source column plus a fresh column for the new component.
//! 3. Detach the source table from the archetype map for the duration of the
//!    move. This allows source and target to be borrowed together, and makes
//!    it impossible to hold a source reference across the map growth in
//!    step 2 — the stale-reference hazard is structurally excluded.
//! 4. Append the entity to the target, bitwise-copy every shared row, write
//!    the new component value through its statically-known type, update the
//!    entity pointer, then release the source row without dropping (the
//!    values now live in the target) and patch the pointer of any entity the
//!    swap relocated.
//! 5. Re-insert the source table — unless it is now empty, non-void, and the
//!    registry was configured to destroy empty archetypes.
//!
//! Failures roll back in LIFO order: partially written target rows are
//! popped, a target archetype created for this move is destroyed, and the
//! untouched source table is re-inserted. The post-rollback state is
//! identical to the pre-call state.
//!
//! ## Concurrency model
//! Single-threaded cooperative. Every operation runs to completion (or rolls
//! back) on the caller's thread before control returns.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::engine::archetype::Archetype;
use crate::engine::component::{ComponentBundle, ComponentInfo, ComponentName, ComponentSet, component_name};
use crate::engine::entity::{EntityIndex, EntityPointer};
use crate::engine::error::{EcsError, EcsResult, ResourceError};
use crate::engine::pipeline::Pipeline;
use crate::engine::plugin::Plugin;
use crate::engine::query::{BufferedQueryIter, BufferedView, EntityView, QueryIter, ViewSlot};
use crate::engine::resource::{ResourceKind, ResourceQuery, Resources};
use crate::engine::storage::{Column, TypeErasedColumn};
use crate::engine::types::{ArchetypeHash, EntityId, Row, VOID_ARCHETYPE};
use crate::engine::update::SharedUpdateQueue;

/// Registry construction options.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegistryConfig {
    /// Destroy a non-void archetype the moment a component-add migration
    /// empties it. The void archetype is never destroyed.
    pub destroy_empty_archetypes: bool,
}

/// Owning container for entities, archetypes, resources, plugins, the
/// pipeline, and pending buffered updates.
pub struct Registry {
    config: RegistryConfig,
    entities: EntityIndex,
    archetypes: FxHashMap<ArchetypeHash, Archetype>,
    resources: Resources,
    plugins: Vec<Plugin>,
    pipeline: Pipeline,
    pending: SharedUpdateQueue,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Registry {
    /// Creates a registry. The void archetype exists from the start and is
    /// never destroyed.
    pub fn new(config: RegistryConfig) -> Self {
        let mut archetypes = FxHashMap::default();
        archetypes.insert(VOID_ARCHETYPE, Archetype::new(VOID_ARCHETYPE));

        Self {
            config,
            entities: EntityIndex::new(),
            archetypes,
            resources: Resources::default(),
            plugins: Vec::new(),
            pipeline: Pipeline::new(),
            pending: SharedUpdateQueue::default(),
        }
    }

    /// The configuration this registry was created with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ── Entity lifecycle ────────────────────────────────────────────────

    /// Creates an entity with no components. It enters the void archetype.
    ///
    /// ## Errors
    /// `IdSpaceExhausted` once the 32-bit identifier counter is used up.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        let row = self
            .archetypes
            .get(&VOID_ARCHETYPE)
            .ok_or(EcsError::InternalInconsistency {
                detail: "void archetype missing from the archetype map",
            })?
            .len();

        let entity = self
            .entities
            .allocate(EntityPointer { archetype: VOID_ARCHETYPE, row })?;

        let void = self
            .archetypes
            .get_mut(&VOID_ARCHETYPE)
            .ok_or(EcsError::InternalInconsistency {
                detail: "void archetype missing from the archetype map",
            })?;
        let pushed = void.push_entity(entity);
        debug_assert_eq!(pushed, row);

        Ok(entity)
    }

    /// Creates an entity and attaches every component of `bundle`, in
    /// declared order. On failure the created entity is destroyed before the
    /// error propagates, so no half-built entity survives.
    pub fn spawn<B: ComponentBundle>(&mut self, bundle: B) -> EcsResult<EntityId> {
        let entity = self.create_entity()?;
        if let Err(error) = bundle.add_to(self, entity) {
            let _ = self.destroy_entity(entity);
            return Err(error);
        }
        Ok(entity)
    }

    /// Removes an entity and drops its component values.
    ///
    /// ## Errors
    /// `NoSuchEntity` if the handle is dead; `InternalInconsistency` if the
    /// entity index disagrees with archetype storage.
    pub fn destroy_entity(&mut self, entity: EntityId) -> EcsResult<()> {
        let pointer = self
            .entities
            .get(entity)
            .ok_or(EcsError::NoSuchEntity { entity })?;

        let archetype = self
            .archetypes
            .get_mut(&pointer.archetype)
            .ok_or(EcsError::InternalInconsistency {
                detail: "entity pointer references a missing archetype",
            })?;

        let removal = archetype
            .swap_remove(pointer.row)
            .map_err(|_| EcsError::InternalInconsistency {
                detail: "entity row out of bounds in its archetype",
            })?;

        if removal.removed != entity {
            return Err(EcsError::InternalInconsistency {
                detail: "removed entity does not match the destroyed entity",
            });
        }

        if let Some(swapped) = removal.swapped {
            let patched = self.entities.set(
                swapped,
                EntityPointer { archetype: pointer.archetype, row: pointer.row },
            );
            if !patched {
                return Err(EcsError::InternalInconsistency {
                    detail: "swapped entity has no pointer",
                });
            }
        }

        self.entities.remove(entity);
        Ok(())
    }

    /// Returns `true` if the entity is alive.
    pub fn contains_entity(&self, entity: EntityId) -> bool {
        self.entities.contains(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The location of an entity, if alive.
    pub fn entity_pointer(&self, entity: EntityId) -> Option<EntityPointer> {
        self.entities.get(entity)
    }

    // ── Components and migration ────────────────────────────────────────

    /// Attaches a component value to an entity, migrating it to the archetype
    /// of its grown component set.
    ///
    /// ## Errors
    /// - `NoSuchEntity` if the handle is dead.
    /// - `DuplicateComponent` if the entity already carries a `C`.
    /// - `InternalInconsistency` if storage invariants are found violated;
    ///   the pre-call state is restored where possible.
    pub fn add_component<C: 'static>(&mut self, entity: EntityId, value: C) -> EcsResult<()> {
        let info = ComponentInfo::of::<C>();
        let pointer = self
            .entities
            .get(entity)
            .ok_or(EcsError::NoSuchEntity { entity })?;
        let source_hash = pointer.archetype;

        {
            let source = self
                .archetypes
                .get(&source_hash)
                .ok_or(EcsError::InternalInconsistency {
                    detail: "entity pointer references a missing archetype",
                })?;
            if source.has_column(info.name) {
                return Err(EcsError::DuplicateComponent { component: info.name });
            }
        }

        let target_hash = source_hash ^ info.hash;
        let created_target = self.materialize_target::<C>(source_hash, target_hash, &info)?;

        // Detach the source table so source and target can be held together.
        let mut source = self
            .archetypes
            .remove(&source_hash)
            .ok_or(EcsError::InternalInconsistency {
                detail: "source archetype vanished before migration",
            })?;

        let moved = match self.archetypes.get_mut(&target_hash) {
            Some(target) => migrate_row(&source, target, pointer.row, entity, value, &info),
            None => Err(EcsError::InternalInconsistency {
                detail: "target archetype vanished during migration",
            }),
        };

        let new_row = match moved {
            Ok(row) => row,
            Err(error) => {
                if created_target {
                    self.archetypes.remove(&target_hash);
                }
                self.archetypes.insert(source_hash, source);
                return Err(error);
            }
        };

        self.entities
            .set(entity, EntityPointer { archetype: target_hash, row: new_row });

        let removal = match source.swap_remove_forgotten(pointer.row) {
            Ok(removal) => removal,
            Err(_) => {
                self.archetypes.insert(source_hash, source);
                return Err(EcsError::InternalInconsistency {
                    detail: "source row out of bounds during migration",
                });
            }
        };

        if removal.removed != entity {
            self.archetypes.insert(source_hash, source);
            return Err(EcsError::InternalInconsistency {
                detail: "removed entity does not match the migrated entity",
            });
        }

        if let Some(swapped) = removal.swapped {
            let patched = self
                .entities
                .set(swapped, EntityPointer { archetype: source_hash, row: pointer.row });
            if !patched {
                self.archetypes.insert(source_hash, source);
                return Err(EcsError::InternalInconsistency {
                    detail: "swapped entity has no pointer",
                });
            }
        }

        let destroy_source = self.config.destroy_empty_archetypes
            && source_hash != VOID_ARCHETYPE
            && source.is_empty();
        if destroy_source {
            tracing::debug!(hash = source_hash, "destroying empty archetype");
        } else {
            self.archetypes.insert(source_hash, source);
        }

        Ok(())
    }

    /// Ensures the target archetype of a migration exists. Returns `true` if
    /// it was created by this call.
    fn materialize_target<C: 'static>(
        &mut self,
        source_hash: ArchetypeHash,
        target_hash: ArchetypeHash,
        info: &ComponentInfo,
    ) -> EcsResult<bool> {
        if self.archetypes.contains_key(&target_hash) {
            return Ok(false);
        }

        let mut table = Archetype::new(target_hash);
        {
            let source = self
                .archetypes
                .get(&source_hash)
                .ok_or(EcsError::InternalInconsistency {
                    detail: "source archetype missing while building the target",
                })?;
            for (name, column) in source.columns() {
                table.insert_column(name, column.clone_empty());
            }
        }
        table.insert_column(info.name, Box::new(Column::<C>::new()));
        self.archetypes.insert(target_hash, table);
        Ok(true)
    }

    /// Returns `true` if the entity's archetype has a column for `C`.
    ///
    /// ## Errors
    /// `NoSuchEntity` if the handle is dead.
    pub fn has_component<C: 'static>(&self, entity: EntityId) -> EcsResult<bool> {
        let pointer = self
            .entities
            .get(entity)
            .ok_or(EcsError::NoSuchEntity { entity })?;
        let archetype = self
            .archetypes
            .get(&pointer.archetype)
            .ok_or(EcsError::InternalInconsistency {
                detail: "entity pointer references a missing archetype",
            })?;
        Ok(archetype.has_column(component_name::<C>()))
    }

    // ── Archetype introspection ─────────────────────────────────────────

    /// Number of archetypes, the void archetype included.
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Borrows an archetype by hash.
    pub fn archetype(&self, hash: ArchetypeHash) -> Option<&Archetype> {
        self.archetypes.get(&hash)
    }

    /// Iterates over every archetype in unspecified order.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.values()
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Matches every archetype whose component set is a superset of `S` and
    /// yields one view per matched entity.
    ///
    /// Archetypes are visited in unspecified order; rows within an archetype
    /// in ascending order. The iterator snapshots row pointers at
    /// construction and keeps the registry mutably borrowed until dropped.
    ///
    /// ## Errors
    /// `InvalidQuery` if `S` repeats a component type.
    pub fn query<S: ComponentSet>(&mut self) -> EcsResult<QueryIter<'_>> {
        let descriptors = validated_descriptors::<S>()?;
        let mut views = Vec::new();

        for archetype in self.archetypes.values_mut() {
            let slots = match match_archetype(archetype, &descriptors)? {
                Some(slots) => slots,
                None => continue,
            };
            for (row, slot) in slots.into_iter().enumerate() {
                let entity = archetype.entity_at(row).ok_or(EcsError::InternalInconsistency {
                    detail: "matched row has no entity",
                })?;
                views.push(EntityView::new(entity, slot));
            }
        }

        Ok(QueryIter::new(views))
    }

    /// Like [`Registry::query`], but the yielded views record writes into the
    /// buffered-update queue instead of mutating live cells.
    pub fn query_buffered<S: ComponentSet>(&mut self) -> EcsResult<BufferedQueryIter<'_>> {
        let descriptors = validated_descriptors::<S>()?;
        let queue = SharedUpdateQueue::clone(&self.pending);
        let mut views = Vec::new();

        for archetype in self.archetypes.values_mut() {
            let slots = match match_archetype(archetype, &descriptors)? {
                Some(slots) => slots,
                None => continue,
            };
            for (row, slot) in slots.into_iter().enumerate() {
                let entity = archetype.entity_at(row).ok_or(EcsError::InternalInconsistency {
                    detail: "matched row has no entity",
                })?;
                views.push(BufferedView::new(entity, slot, SharedUpdateQueue::clone(&queue)));
            }
        }

        Ok(BufferedQueryIter::new(views))
    }

    // ── Buffered updates ────────────────────────────────────────────────

    /// Applies every pending buffered update in FIFO order, then clears the
    /// queue. Several updates targeting the same cell land last-writer-wins.
    pub fn apply_buffered_updates(&mut self) {
        let mut pending = self.pending.borrow_mut();
        tracing::debug!(count = pending.len(), "applying buffered updates");
        pending.apply_all();
    }

    /// Clears the pending queue without applying anything.
    pub fn discard_buffered_updates(&mut self) {
        self.pending.borrow_mut().discard_all();
    }

    /// Returns `true` if buffered updates are waiting to be applied.
    pub fn has_pending_updates(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Number of buffered updates waiting to be applied.
    pub fn pending_update_count(&self) -> usize {
        self.pending.borrow().len()
    }

    // ── Resources ───────────────────────────────────────────────────────

    /// Registers resource type `R` with the given storage kind. The kind is
    /// immutable for the registry's lifetime.
    ///
    /// ## Errors
    /// `AlreadyRegistered` on repeat registration.
    pub fn register_resource<R: 'static>(&mut self, kind: ResourceKind) -> Result<(), ResourceError> {
        self.resources.register::<R>(kind)
    }

    /// Returns `true` if `R` has been registered.
    pub fn resource_registered<R: 'static>(&self) -> bool {
        self.resources.registered::<R>()
    }

    /// The registered kind of `R`, if any.
    pub fn resource_kind<R: 'static>(&self) -> Option<ResourceKind> {
        self.resources.kind_of::<R>()
    }

    /// Stores a resource value: replaces the singleton cell (dropping the
    /// previous value) or appends to the collection.
    pub fn push_resource<R: 'static>(&mut self, value: R) -> Result<(), ResourceError> {
        self.resources.push(value)
    }

    /// Queries a registered resource, yielding the variant matching its kind.
    pub fn query_resource<R: 'static>(&mut self) -> Result<ResourceQuery<'_, R>, ResourceError> {
        self.resources.query::<R>()
    }

    /// Drops every stored value of `R`.
    pub fn clear_resource<R: 'static>(&mut self) -> Result<(), ResourceError> {
        self.resources.clear::<R>()
    }

    /// Removes one stored value of `R`: singletons drop their cell,
    /// collections remove at `index` with ordered semantics.
    pub fn remove_resource<R: 'static>(&mut self, index: usize) -> Result<(), ResourceError> {
        self.resources.remove::<R>(index)
    }

    // ── Plugins and pipeline ────────────────────────────────────────────

    /// Appends a plugin and invokes its initialization callback.
    pub fn add_plugin(&mut self, mut plugin: Plugin) {
        tracing::debug!(plugin = plugin.name(), "adding plugin");
        let init = plugin.take_init();
        self.plugins.push(plugin);
        if let Some(mut init) = init {
            init(self);
        }
    }

    /// Installs the pipeline driven by [`Registry::run_pipeline`].
    pub fn set_pipeline(&mut self, pipeline: Pipeline) {
        self.pipeline = pipeline;
    }

    /// Borrows the installed pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Mutably borrows the installed pipeline.
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    /// Executes the installed pipeline once against this registry.
    ///
    /// The pipeline is detached for the duration of the run; a pipeline
    /// installed by a system during execution is discarded when the detached
    /// pipeline is re-installed.
    pub fn run_pipeline(&mut self) {
        let mut pipeline = std::mem::take(&mut self.pipeline);
        pipeline.execute(self);
        self.pipeline = pipeline;
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        // Teardown order: plugins first, then the pipeline's systems.
        // Resources, archetypes, and pending updates are released by their
        // own Drop implementations afterwards.
        let mut plugins = std::mem::take(&mut self.plugins);
        for plugin in plugins.iter_mut() {
            if let Some(mut teardown) = plugin.take_teardown() {
                teardown(self);
            }
        }

        let mut pipeline = std::mem::take(&mut self.pipeline);
        pipeline.teardown();

        self.pending.borrow_mut().discard_all();
    }
}

/// Validates a query's component set: at least one member, all distinct.
fn validated_descriptors<S: ComponentSet>() -> EcsResult<SmallVec<[ComponentInfo; 8]>> {
    let descriptors = S::descriptors();
    if descriptors.is_empty() {
        return Err(EcsError::InvalidQuery { reason: "query requires at least one component type" });
    }
    for (position, descriptor) in descriptors.iter().enumerate() {
        if descriptors[..position]
            .iter()
            .any(|earlier| earlier.type_id == descriptor.type_id)
        {
            return Err(EcsError::InvalidQuery { reason: "duplicate component type in query" });
        }
    }
    Ok(descriptors)
}

/// Snapshots per-row component pointers for one archetype, or `None` if the
/// archetype does not carry every requested component.
fn match_archetype(
    archetype: &mut Archetype,
    descriptors: &[ComponentInfo],
) -> EcsResult<Option<Vec<SmallVec<[ViewSlot; 4]>>>> {
    if !descriptors.iter().all(|descriptor| archetype.has_column(descriptor.name)) {
        return Ok(None);
    }

    let rows = archetype.len();
    let mut slots: Vec<SmallVec<[ViewSlot; 4]>> = vec![SmallVec::new(); rows];

    for descriptor in descriptors {
        let column = archetype
            .column_mut(descriptor.name)
            .ok_or(EcsError::InternalInconsistency { detail: "matched column disappeared" })?;
        for (row, slot) in slots.iter_mut().enumerate() {
            let ptr = column.row_ptr_mut(row).ok_or(EcsError::InternalInconsistency {
                detail: "column shorter than its archetype",
            })?;
            slot.push((descriptor.type_id, descriptor.name, ptr));
        }
    }

    Ok(Some(slots))
}

/// Builds the entity's row in the target archetype: bitwise-copies every
/// shared column value and writes the newly added component. On failure the
/// partially written row is rolled back in LIFO order and the target is left
/// exactly as it was.
fn migrate_row<C: 'static>(
    source: &Archetype,
    target: &mut Archetype,
    source_row: Row,
    entity: EntityId,
    value: C,
    info: &ComponentInfo,
) -> EcsResult<Row> {
    let new_row = target.push_entity(entity);
    let mut written: SmallVec<[ComponentName; 8]> = SmallVec::new();

    for (name, column) in source.columns() {
        let destination = match target.column_mut(name) {
            Some(destination) => destination,
            None => {
                return Err(rollback_partial_row(
                    target,
                    &written,
                    new_row,
                    EcsError::InternalInconsistency { detail: "target archetype misses a shared column" },
                ));
            }
        };

        match column.copy_row_to(source_row, destination) {
            Ok(row) if row == new_row => written.push(name),
            Ok(_) => {
                // The stray copy is the most recent push on this column.
                let _ = destination.swap_remove_forget(destination.len() - 1);
                return Err(rollback_partial_row(
                    target,
                    &written,
                    new_row,
                    EcsError::InternalInconsistency { detail: "target columns disagreed on row placement" },
                ));
            }
            Err(error) => {
                return Err(rollback_partial_row(target, &written, new_row, error.into()));
            }
        }
    }

    let column = match target
        .column_mut(info.name)
        .and_then(|column| column.as_any_mut().downcast_mut::<Column<C>>())
    {
        Some(column) => column,
        None => {
            return Err(rollback_partial_row(
                target,
                &written,
                new_row,
                EcsError::InternalInconsistency { detail: "target misses the added component column" },
            ));
        }
    };

    let row = column.push(value);
    if row != new_row {
        // Drop the stray value, then unwind the shared copies.
        let _ = TypeErasedColumn::swap_remove(column, row);
        return Err(rollback_partial_row(
            target,
            &written,
            new_row,
            EcsError::InternalInconsistency { detail: "added component landed on the wrong row" },
        ));
    }

    Ok(new_row)
}

/// Unwinds the bitwise copies written into a partially built target row, then
/// removes the appended entity. Returns `error` for caller convenience.
fn rollback_partial_row(
    target: &mut Archetype,
    written: &[ComponentName],
    row: Row,
    error: EcsError,
) -> EcsError {
    for name in written.iter().rev() {
        if let Some(column) = target.column_mut(name) {
            let _ = column.swap_remove_forget(row);
        }
    }
    target.pop_entity();
    error
}
