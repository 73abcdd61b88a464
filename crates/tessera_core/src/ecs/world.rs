//! # ECS World
//!
//! The central container: entity table, component registry, samples,
//! handler lists and the events queue.
//!
//! ## Flush points
//!
//! Entity adds and removals are queued and completed at the next flush point:
//! immediately when requested from the top level, otherwise as soon as the
//! outermost dispatch (or update phase) returns. Component and active-state
//! changes on live entities update samples synchronously.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use super::aspect::EntityAspect;
use super::component::{Component, ComponentId, ComponentKey, ComponentRegistry, ComponentSet};
use super::entity::{Entity, EntityId};
use super::event::{
    EcsEventParams, EcsWorldWillBeDestroyedEvent, EntityActiveChangedEvent, EntityAddedEvent,
    EntityAddedToSampleEvent, EntityRemovedEvent, EntityRemovedFromSampleEvent, PostUpdateEvent,
    PreUpdateEvent, UpdateEvent,
};
use super::handler::HandlerList;
use super::queue::{EcsWorldEventsQueue, StructuralOp};
use super::sample::{EntitiesSample, SampleFlags, SampleKey, SampleKind};
use super::signal::{Listeners, Subscription};
use super::table::{EntityRecord, EntityTable};
use super::world_tag::{acquire_world_tag, release_world_tag};
use crate::error::{EcsError, EcsResult};

type EntityListener = dyn Fn(&EcsWorld, EntityId);
type DestroyListener = dyn Fn(&str);

/// Lifecycle of a world. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EcsWorldState {
    /// Under construction.
    None,
    /// Accepting entities, systems and events.
    Active,
    /// Draining pending work before teardown.
    PreparingToDestroy,
    /// Removing every entity.
    Destroying,
    /// Torn down. Only queries remain meaningful.
    Destroyed,
}

/// The ECS World.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = EcsWorld::create("game", ["client"])?;
///
/// world.add_system_event_handler::<UpdateEvent, (Position, Velocity)>(
///     "movement",
///     |world, id, event| {
///         let velocity = world.component::<Velocity>(id).copied().unwrap_or_default();
///         if let Some(position) = world.component_mut::<Position>(id) {
///             position.x += velocity.x * event.dt;
///         }
///     },
///     HandlerOptions::new(),
/// )?;
///
/// world.add_entity(Entity::new().with_component(Position::default()).with_component(Velocity::default()))?;
/// world.update(1.0 / 60.0)?;
/// ```
pub struct EcsWorld {
    pub(crate) name: String,
    pub(crate) tag: u16,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) state: EcsWorldState,
    pub(crate) table: EntityTable,
    pub(crate) registry: ComponentRegistry,
    pub(crate) samples: Vec<EntitiesSample>,
    pub(crate) handlers: HashMap<std::any::TypeId, HandlerList>,
    pub(crate) next_handler_seq: u64,
    pub(crate) queue: EcsWorldEventsQueue,
    pub(crate) dispatch_depth: u32,
    pub(crate) draining_events: bool,
    flushing: bool,
    updating: bool,
    destroy_requested: bool,
    frame: u64,
    entity_added_listeners: Listeners<EntityListener>,
    entity_changed_listeners: Listeners<EntityListener>,
    entity_removed_listeners: Listeners<EntityListener>,
    destroy_listeners: Listeners<DestroyListener>,
}

impl EcsWorld {
    /// Creates an active world without tags.
    ///
    /// # Errors
    ///
    /// [`EcsError::WorldTagsExhausted`] if every world tag is held by a live world.
    pub fn new(name: impl Into<String>) -> EcsResult<Self> {
        Self::create(name, std::iter::empty::<String>())
    }

    /// Creates an active world carrying `tags`.
    ///
    /// Handlers only attach to worlds that carry all of their tags. The
    /// world's id tag stays reserved until the world is dropped.
    ///
    /// # Errors
    ///
    /// [`EcsError::WorldTagsExhausted`] if every world tag is held by a live world.
    pub fn create<I, S>(name: impl Into<String>, tags: I) -> EcsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let Some(tag) = acquire_world_tag() else {
            tracing::error!(world = %name, "no free world tag");
            return Err(EcsError::WorldTagsExhausted(name));
        };
        let mut world = Self {
            name,
            tag,
            tags: tags.into_iter().map(Into::into).collect(),
            state: EcsWorldState::None,
            table: EntityTable::new(tag),
            registry: ComponentRegistry::new(),
            samples: Vec::new(),
            handlers: HashMap::new(),
            next_handler_seq: 0,
            queue: EcsWorldEventsQueue::default(),
            dispatch_depth: 0,
            draining_events: false,
            flushing: false,
            updating: false,
            destroy_requested: false,
            frame: 0,
            entity_added_listeners: Listeners::new(),
            entity_changed_listeners: Listeners::new(),
            entity_removed_listeners: Listeners::new(),
            destroy_listeners: Listeners::new(),
        };
        world.state = EcsWorldState::Active;
        tracing::debug!(world = %world.name, tag, "world created");
        Ok(world)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// World name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tags carried by the world.
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Checks whether the world carries `tag`.
    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> EcsWorldState {
        self.state
    }

    /// Returns true while the world accepts entities and systems.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == EcsWorldState::Active
    }

    /// Tag embedded in every id this world allocates.
    #[inline]
    #[must_use]
    pub fn world_tag(&self) -> u16 {
        self.tag
    }

    /// Number of completed updates.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Returns true while `update` runs.
    #[inline]
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.updating
    }

    /// Returns true while a handler list is being dispatched.
    #[inline]
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.dispatch_depth > 0
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn entities_count(&self) -> usize {
        self.table.len()
    }

    /// Snapshot of live entity ids.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.table.ids()
    }

    /// Number of cached samples.
    #[inline]
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of deferred events waiting in either queue buffer.
    #[must_use]
    pub fn deferred_event_count(&self) -> usize {
        self.queue.pending_event_count()
    }

    /// The world's component registry.
    #[inline]
    #[must_use]
    pub fn component_registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Mutable access to the registry, e.g. to declare dynamic components
    /// with capabilities before use.
    #[inline]
    pub fn component_registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Returns true if `id` was minted by this world.
    #[inline]
    #[must_use]
    pub fn owns(&self, id: EntityId) -> bool {
        !id.is_null() && id.world_tag() == self.tag
    }

    pub(crate) fn check_owner(&self, id: EntityId, operation: &'static str) -> bool {
        if id.is_null() {
            return false;
        }
        if id.world_tag() != self.tag {
            tracing::warn!(
                world = %self.name,
                entity = ?id,
                operation,
                "entity belongs to another world"
            );
            return false;
        }
        true
    }

    fn require_active(&self, operation: &'static str) -> EcsResult<()> {
        if self.state == EcsWorldState::Active {
            return Ok(());
        }
        tracing::warn!(world = %self.name, state = ?self.state, operation, "world is not active");
        Err(EcsError::WorldNotActive {
            world: self.name.clone(),
            state: self.state,
        })
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Adds a detached entity to the world.
    ///
    /// The id is assigned immediately. The entity joins the table and its
    /// samples at the next flush point, which is right away unless a dispatch
    /// is in progress.
    ///
    /// # Errors
    ///
    /// [`EcsError::WorldNotActive`] once teardown has begun.
    pub fn add_entity(&mut self, entity: Entity) -> EcsResult<EntityId> {
        self.require_active("add_entity")?;
        let id = self.table.generate_new_entity_id();
        tracing::trace!(world = %self.name, entity = %id, "entity queued for adding");
        self.queue.push_add(id, entity);
        self.flush_structural();
        Ok(id)
    }

    /// Adds an empty entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::WorldNotActive`] once teardown has begun.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        self.add_entity(Entity::new())
    }

    /// Pre-creates `count` free entity slots.
    pub fn reserve_entity_indices(&mut self, count: usize) {
        self.table.reserve_entity_indices(count);
    }

    /// Schedules an entity for removal.
    ///
    /// The entity is marked removing right away (dispatch skips it from then
    /// on) and leaves the world at the next flush point.
    ///
    /// # Returns
    ///
    /// `false` if the id is unknown, stale, foreign or already being removed.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        if !self.check_owner(id, "remove_entity") {
            return false;
        }
        if self.table.is_pending(id) {
            // The slot is released when the cancelled add is flushed.
            return self.queue.take_pending_entity(id).is_some();
        }
        let Some(record) = self.table.get_mut(id) else {
            return false;
        };
        if record.removing {
            return false;
        }
        record.removing = true;
        tracing::trace!(world = %self.name, entity = %id, "entity queued for removal");
        self.queue.push_remove(id);
        self.flush_structural();
        true
    }

    /// Removes an entity and hands it back detached, components included.
    ///
    /// Unlike [`remove_entity`](Self::remove_entity) the removal completes
    /// before this returns, even during a dispatch.
    ///
    /// # Returns
    ///
    /// `None` if the id is unknown, stale, foreign or already being removed.
    pub fn take_entity(&mut self, id: EntityId) -> Option<Entity> {
        if !self.check_owner(id, "take_entity") {
            return None;
        }
        if self.table.is_pending(id) {
            return self.queue.take_pending_entity(id);
        }
        if self.table.get(id)?.removing {
            return None;
        }
        let record = self.complete_removal(id)?;
        Some(self.detach_record(record))
    }

    /// Returns true if `id` resolves to a live entity.
    #[inline]
    #[must_use]
    pub fn contains_entity(&self, id: EntityId) -> bool {
        self.table.contains(id)
    }

    /// Returns true if `id` was allocated and its add is still queued.
    #[inline]
    #[must_use]
    pub fn is_entity_pending(&self, id: EntityId) -> bool {
        self.table.is_pending(id)
    }

    /// Returns true if a live entity is scheduled for removal.
    #[must_use]
    pub fn is_entity_removing(&self, id: EntityId) -> bool {
        self.table.get(id).is_some_and(|record| record.removing)
    }

    fn detach_record(&self, record: EntityRecord) -> Entity {
        let components = record
            .components
            .into_iter()
            .filter_map(|(component, value)| {
                let info = self.registry.info(component)?;
                Some((info.key().clone(), value))
            })
            .collect();
        Entity {
            components,
            active_self: record.active_self,
        }
    }

    /// Completes every queued add and removal, unless a dispatch or another
    /// flush is running.
    pub(crate) fn flush_structural(&mut self) {
        if self.dispatch_depth > 0 || self.flushing {
            return;
        }
        self.flushing = true;
        while let Some(op) = self.queue.pop_structural() {
            match op {
                StructuralOp::Add { id, entity } => self.complete_add(id, entity),
                StructuralOp::Remove(id) => {
                    self.complete_removal(id);
                }
            }
        }
        self.flushing = false;
        self.service_destroy_request();
    }

    fn complete_add(&mut self, id: EntityId, entity: Option<Entity>) {
        let entity = match entity {
            Some(entity) if self.state < EcsWorldState::Destroying => entity,
            _ => {
                tracing::trace!(world = %self.name, entity = %id, "cancelled add released");
                self.table.release(id);
                return;
            }
        };

        let mut record = EntityRecord::new(entity.active_self);
        for (key, value) in entity.components {
            let component = self.registry.register_key(&key);
            record.insert(component, value);
        }
        if !self.table.insert(id, record) {
            return;
        }
        tracing::debug!(world = %self.name, entity = %id, "entity added");

        for listener in self.entity_added_listeners.snapshot() {
            listener(self, id);
        }
        self.process_entity_for_samples(id);
        self.send_event_immediate(id, &mut EntityAddedEvent);
    }

    fn complete_removal(&mut self, id: EntityId) -> Option<EntityRecord> {
        self.table.get_mut(id)?.removing = true;

        self.send_event_immediate_with(id, &mut EntityRemovedEvent, EcsEventParams::UNFILTERED);
        for listener in self.entity_removed_listeners.snapshot() {
            listener(self, id);
        }
        self.process_entity_for_samples(id);

        let record = self.table.remove(id)?;
        tracing::debug!(world = %self.name, entity = %id, "entity removed");
        Some(record)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches a component to a live or pending entity.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ForeignEntity`] if the id belongs to another world
    /// - [`EcsError::EntityNotFound`] if the id does not resolve
    /// - [`EcsError::DuplicateComponent`] if the entity already has a `T`
    pub fn add_component<T: Component>(&mut self, id: EntityId, component: T) -> EcsResult<()> {
        self.insert_component(id, ComponentKey::of::<T>(), Box::new(component))
            .map(|_| ())
    }

    /// Attaches a dynamic component registered under `name`.
    ///
    /// # Errors
    ///
    /// Same as [`add_component`](Self::add_component).
    pub fn add_dynamic_component(
        &mut self,
        id: EntityId,
        name: &str,
        component: Box<dyn Any>,
    ) -> EcsResult<ComponentId> {
        self.insert_component(id, ComponentKey::Dynamic(name.to_owned()), component)
    }

    fn insert_component(
        &mut self,
        id: EntityId,
        key: ComponentKey,
        value: Box<dyn Any>,
    ) -> EcsResult<ComponentId> {
        if !id.is_null() && !self.check_owner(id, "add_component") {
            return Err(EcsError::ForeignEntity(id));
        }
        let component = self.registry.register_key(&key);

        if self.table.is_pending(id) {
            let entity = self
                .queue
                .pending_entity_mut(id)
                .ok_or(EcsError::EntityNotFound(id))?;
            if entity.components.iter().any(|(existing, _)| *existing == key) {
                return Err(EcsError::DuplicateComponent {
                    entity: id,
                    component: key.name().to_owned(),
                });
            }
            entity.components.push((key, value));
            return Ok(component);
        }

        let record = self
            .table
            .get_mut(id)
            .ok_or(EcsError::EntityNotFound(id))?;
        if record.components.contains_key(&component) {
            return Err(EcsError::DuplicateComponent {
                entity: id,
                component: key.name().to_owned(),
            });
        }
        record.insert(component, value);
        self.entity_changed(id);
        Ok(component)
    }

    /// Detaches and returns a component.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> Option<T> {
        let component = self.registry.id_of::<T>()?;
        let value = self.remove_component_by_id(id, component)?;
        value.downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Detaches and returns a dynamic component.
    pub fn remove_dynamic_component(&mut self, id: EntityId, name: &str) -> Option<Box<dyn Any>> {
        let component = self.registry.id_by_name(name)?;
        self.remove_component_by_id(id, component)
    }

    fn remove_component_by_id(&mut self, id: EntityId, component: ComponentId) -> Option<Box<dyn Any>> {
        if !self.check_owner(id, "remove_component") {
            return None;
        }
        if self.table.is_pending(id) {
            let key = self.registry.info(component)?.key().clone();
            let entity = self.queue.pending_entity_mut(id)?;
            let position = entity.components.iter().position(|(k, _)| *k == key)?;
            return Some(entity.components.remove(position).1);
        }
        let value = self.table.get_mut(id)?.remove(component)?;
        self.entity_changed(id);
        Some(value)
    }

    /// Gets a component of a live entity.
    #[must_use]
    pub fn component<T: Component>(&self, id: EntityId) -> Option<&T> {
        let component = self.registry.id_of::<T>()?;
        self.table
            .get(id)?
            .components
            .get(&component)?
            .downcast_ref::<T>()
    }

    /// Gets a mutable component of a live entity.
    ///
    /// Mutating component data does not change sample membership.
    pub fn component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        let component = self.registry.id_of::<T>()?;
        self.table
            .get_mut(id)?
            .components
            .get_mut(&component)?
            .downcast_mut::<T>()
    }

    /// Checks whether a live entity has a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        self.registry
            .id_of::<T>()
            .is_some_and(|component| self.has_component_id(id, component))
    }

    /// Checks whether a live entity has the component `component`.
    #[must_use]
    pub fn has_component_id(&self, id: EntityId, component: ComponentId) -> bool {
        self.table
            .get(id)
            .is_some_and(|record| record.mask.contains(component))
    }

    /// Gets a dynamic component of a live entity.
    #[must_use]
    pub fn dynamic_component(&self, id: EntityId, name: &str) -> Option<&dyn Any> {
        let component = self.registry.id_by_name(name)?;
        self.table
            .get(id)?
            .components
            .get(&component)
            .map(|value| &**value)
    }

    /// Gets a mutable dynamic component of a live entity.
    pub fn dynamic_component_mut(&mut self, id: EntityId, name: &str) -> Option<&mut dyn Any> {
        let component = self.registry.id_by_name(name)?;
        self.table
            .get_mut(id)?
            .components
            .get_mut(&component)
            .map(|value| &mut **value)
    }

    /// Component ids of a live entity, ascending.
    #[must_use]
    pub fn component_ids(&self, id: EntityId) -> Vec<ComponentId> {
        self.table
            .get(id)
            .map(|record| record.mask.iter().collect())
            .unwrap_or_default()
    }

    /// Sets an entity's `active_self` flag.
    ///
    /// Samples without [`SampleFlags::INCLUDE_INACTIVE`] drop inactive
    /// entities. A change sends [`EntityActiveChangedEvent`] to the entity.
    ///
    /// # Returns
    ///
    /// `false` if the id does not resolve.
    pub fn set_entity_active(&mut self, id: EntityId, active: bool) -> bool {
        if !self.check_owner(id, "set_entity_active") {
            return false;
        }
        if self.table.is_pending(id) {
            return self
                .queue
                .pending_entity_mut(id)
                .map(|entity| entity.active_self = active)
                .is_some();
        }
        let Some(record) = self.table.get_mut(id) else {
            return false;
        };
        if record.active_self == active {
            return true;
        }
        record.active_self = active;
        tracing::trace!(world = %self.name, entity = %id, active, "entity active changed");

        self.process_entity_for_samples(id);
        self.send_event_immediate(id, &mut EntityActiveChangedEvent { active });
        for listener in self.entity_changed_listeners.snapshot() {
            listener(self, id);
        }
        true
    }

    /// Returns the `active_self` flag of a live entity.
    #[must_use]
    pub fn is_entity_active(&self, id: EntityId) -> bool {
        self.table.get(id).is_some_and(|record| record.active_self)
    }

    fn entity_changed(&mut self, id: EntityId) {
        self.process_entity_for_samples(id);
        for listener in self.entity_changed_listeners.snapshot() {
            listener(self, id);
        }
    }

    // =========================================================================
    // Samples
    // =========================================================================

    /// Returns the sample for `aspect`, creating and backfilling it on first request.
    pub fn request_sample(&mut self, aspect: EntityAspect, flags: SampleFlags) -> EntitiesSample {
        self.request_sample_with_key(SampleKey {
            kind: SampleKind::Common,
            aspect,
            flags,
        })
    }

    /// Returns the sample of entities owning every type in `S`.
    pub fn request_inclusive_sample<S: ComponentSet>(&mut self, flags: SampleFlags) -> EntitiesSample {
        let components = S::register(&mut self.registry);
        self.request_sample_with_key(SampleKey {
            kind: SampleKind::GenericInclusive,
            aspect: EntityAspect::all_of(components),
            flags,
        })
    }

    /// Returns the sample of entities owning `component`.
    ///
    /// An id the registry does not know yields an always-empty sample.
    pub fn request_dynamic_id_sample(&mut self, component: ComponentId, flags: SampleFlags) -> EntitiesSample {
        let aspect = if self.registry.info(component).is_some() {
            EntityAspect::all_of([component])
        } else {
            tracing::debug!(world = %self.name, component = component.0, "unknown component id, sample stays empty");
            EntityAspect::any_of([])
        };
        self.request_sample_with_key(SampleKey {
            kind: SampleKind::DynamicId,
            aspect,
            flags,
        })
    }

    /// Returns the sample of entities owning the component named `name`.
    ///
    /// An unknown name yields an always-empty sample.
    pub fn request_dynamic_sample(&mut self, name: &str, flags: SampleFlags) -> EntitiesSample {
        let component = self
            .registry
            .id_by_name(name)
            .unwrap_or(ComponentId(u32::MAX));
        self.request_dynamic_id_sample(component, flags)
    }

    fn request_sample_with_key(&mut self, key: SampleKey) -> EntitiesSample {
        if let Some(sample) = self.samples.iter().find(|sample| sample.has_key(&key)) {
            return sample.clone();
        }

        let sample = EntitiesSample::new(key, self.tag);
        for id in self.table.ids() {
            if let Some(record) = self.table.get(id) {
                if sample.accepts(&record.mask, record.active_self, record.removing) {
                    sample.insert(id);
                }
            }
        }
        tracing::trace!(world = %self.name, members = sample.len(), "sample created");
        self.samples.push(sample.clone());
        sample
    }

    /// Calls `f` for every member of `sample`.
    ///
    /// Iterates a snapshot and re-checks membership before each call, so `f`
    /// may add, remove or mutate entities freely. Entities scheduled for
    /// removal are skipped.
    pub fn process_sample<F>(&mut self, sample: &EntitiesSample, mut f: F)
    where
        F: FnMut(&mut EcsWorld, EntityId),
    {
        for id in sample.entity_ids() {
            if sample.contains(id) && !self.is_entity_removing(id) {
                f(self, id);
            }
        }
    }

    /// Re-evaluates one entity against every sample, notifying sample handlers
    /// of each transition.
    pub(crate) fn process_entity_for_samples(&mut self, id: EntityId) {
        let mut index = 0;
        while index < self.samples.len() {
            let sample = self.samples[index].clone();
            index += 1;

            let wanted = self.table.get(id).is_some_and(|record| {
                sample.accepts(&record.mask, record.active_self, record.removing)
            });
            if wanted {
                if sample.insert(id) {
                    self.notify_sample_handlers::<EntityAddedToSampleEvent>(&sample, id);
                }
            } else if sample.remove(id) {
                self.notify_sample_handlers::<EntityRemovedFromSampleEvent>(&sample, id);
            }
        }
    }

    fn prune_samples(&mut self) {
        let before = self.samples.len();
        self.samples.retain(|sample| sample.strong_count() > 1);
        let pruned = before - self.samples.len();
        if pruned > 0 {
            tracing::trace!(world = %self.name, pruned, "unused samples pruned");
        }
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Runs one frame.
    ///
    /// Drains deferred events, broadcasts [`PreUpdateEvent`], [`UpdateEvent`]
    /// and [`PostUpdateEvent`] (completing queued adds and removals after each
    /// phase), prunes unreferenced samples and advances the frame counter.
    ///
    /// # Errors
    ///
    /// - [`EcsError::AlreadyUpdating`] if called from inside an update
    /// - [`EcsError::WorldNotActive`] once teardown has begun
    pub fn update(&mut self, dt: f32) -> EcsResult<()> {
        if self.updating {
            tracing::warn!(world = %self.name, "nested update rejected");
            return Err(EcsError::AlreadyUpdating(self.name.clone()));
        }
        self.require_active("update")?;

        self.updating = true;
        self.process_deferred_events();

        self.broadcast_event_immediate(&mut PreUpdateEvent { dt });
        self.flush_structural();
        self.broadcast_event_immediate(&mut UpdateEvent { dt });
        self.flush_structural();
        self.broadcast_event_immediate(&mut PostUpdateEvent { dt });
        self.flush_structural();

        self.prune_samples();
        self.frame += 1;
        self.updating = false;

        self.service_destroy_request();
        Ok(())
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Calls `listener` after an entity joins the table, before its samples
    /// are updated.
    pub fn on_entity_added(&self, listener: impl Fn(&EcsWorld, EntityId) + 'static) -> Subscription {
        self.entity_added_listeners.subscribe(Rc::new(listener))
    }

    /// Calls `listener` after a component is added or removed, or after the
    /// active flag changes.
    pub fn on_entity_changed(&self, listener: impl Fn(&EcsWorld, EntityId) + 'static) -> Subscription {
        self.entity_changed_listeners.subscribe(Rc::new(listener))
    }

    /// Calls `listener` when an entity starts leaving the world, while it is
    /// still resolvable.
    pub fn on_entity_removed(&self, listener: impl Fn(&EcsWorld, EntityId) + 'static) -> Subscription {
        self.entity_removed_listeners.subscribe(Rc::new(listener))
    }

    /// Calls `listener` with the world name once teardown has finished.
    pub fn on_destroy(&self, listener: impl Fn(&str) + 'static) -> Subscription {
        self.destroy_listeners.subscribe(Rc::new(listener))
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Tears the world down.
    ///
    /// 1. PreparingToDestroy: pending work is drained and
    ///    [`EcsWorldWillBeDestroyedEvent`] is broadcast
    /// 2. Every system is detached
    /// 3. Destroying: every entity is removed
    /// 4. Destroyed: `on_destroy` listeners are notified
    ///
    /// Called from inside a dispatch or update, the teardown runs as soon as
    /// control returns to the top level. Calling it again is a no-op.
    pub fn destroy(&mut self) {
        if self.state >= EcsWorldState::PreparingToDestroy {
            return;
        }
        if self.is_busy() {
            tracing::debug!(world = %self.name, "destroy requested while busy, deferred");
            self.destroy_requested = true;
            return;
        }
        self.destroy_now();
    }

    fn is_busy(&self) -> bool {
        self.dispatch_depth > 0 || self.updating || self.flushing || self.draining_events
    }

    pub(crate) fn service_destroy_request(&mut self) {
        if self.destroy_requested && !self.is_busy() {
            self.destroy_requested = false;
            self.destroy_now();
        }
    }

    fn destroy_now(&mut self) {
        if self.state >= EcsWorldState::PreparingToDestroy {
            return;
        }
        tracing::info!(world = %self.name, entities = self.table.len(), "world destroying");

        self.state = EcsWorldState::PreparingToDestroy;
        self.process_deferred_events();
        self.flush_structural();
        self.broadcast_event_immediate(&mut EcsWorldWillBeDestroyedEvent);
        self.process_deferred_events();

        self.detach_all_systems();

        self.state = EcsWorldState::Destroying;
        self.flush_structural();
        for id in self.table.ids() {
            self.remove_entity(id);
        }
        self.flush_structural();
        self.samples.clear();

        self.state = EcsWorldState::Destroyed;
        for listener in self.destroy_listeners.snapshot() {
            listener(&self.name);
        }
        tracing::debug!(world = %self.name, "world destroyed");
    }
}

impl Drop for EcsWorld {
    fn drop(&mut self) {
        self.destroy_now();
        release_world_tag(self.tag);
    }
}

impl fmt::Debug for EcsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcsWorld")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("state", &self.state)
            .field("entities", &self.table.len())
            .field("samples", &self.samples.len())
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}
