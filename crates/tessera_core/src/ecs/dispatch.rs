//! # Event Dispatch
//!
//! Handler registration and the broadcast/send protocol.
//!
//! | Call | Delivery |
//! |------|----------|
//! | `broadcast_event_immediate` | global handlers once, sample handlers once per member |
//! | `send_event_immediate` | sample handlers whose sample contains the entity |
//! | `broadcast_event` / `send_event` | same, at the next `process_deferred_events` |
//!
//! Every dispatch iterates a snapshot of the handler list and re-checks
//! sample membership before each call, so handlers may register or remove
//! handlers, entities and components while they run.

use std::any::{type_name, Any, TypeId};
use std::rc::Rc;

use super::component::ComponentSet;
use super::entity::EntityId;
use super::event::{DeferredEvent, EcsEventParams, Event};
use super::handler::{ComponentSystemEventHandler, HandlerFn, HandlerOptions, SystemHandle};
use super::sample::EntitiesSample;
use super::world::{EcsWorld, EcsWorldState};
use crate::error::{EcsError, EcsResult};

impl EcsWorld {
    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a handler for `E` bound to the inclusive sample of `S`.
    ///
    /// # Arguments
    ///
    /// * `name` - System name, used by other systems' ordering constraints
    /// * `callback` - Called once per matching entity
    /// * `options` - Tags, ordering constraints and sample flags
    ///
    /// # Errors
    ///
    /// - [`EcsError::TagsNotSupported`] if the world lacks a required tag
    /// - [`EcsError::SystemOrderCycle`] if the constraints cannot be satisfied
    /// - [`EcsError::WorldNotActive`] once teardown has begun
    pub fn add_system_event_handler<E, S>(
        &mut self,
        name: impl Into<String>,
        callback: impl Fn(&mut EcsWorld, EntityId, &mut E) + 'static,
        options: HandlerOptions,
    ) -> EcsResult<SystemHandle>
    where
        E: Event,
        S: ComponentSet,
    {
        let sample = self.request_inclusive_sample::<S>(options.sample_flags);
        self.add_system_event_handler_for_sample(name, &sample, callback, options)
    }

    /// Registers a handler for `E` bound to an existing sample.
    ///
    /// # Errors
    ///
    /// As [`add_system_event_handler`](Self::add_system_event_handler), plus
    /// [`EcsError::ForeignSample`] if `sample` belongs to another world.
    pub fn add_system_event_handler_for_sample<E: Event>(
        &mut self,
        name: impl Into<String>,
        sample: &EntitiesSample,
        callback: impl Fn(&mut EcsWorld, EntityId, &mut E) + 'static,
        options: HandlerOptions,
    ) -> EcsResult<SystemHandle> {
        let erased: Rc<HandlerFn> = Rc::new(
            move |world: &mut EcsWorld, entity: Option<EntityId>, event: &mut dyn Any| {
                if let (Some(entity), Some(event)) = (entity, event.downcast_mut::<E>()) {
                    callback(world, entity, event);
                }
            },
        );
        self.attach_handler::<E>(name.into(), Some(sample.clone()), erased, options)
    }

    /// Registers a global handler for `E`. Global handlers receive broadcasts
    /// only, never entity-targeted sends.
    ///
    /// # Errors
    ///
    /// As [`add_system_event_handler`](Self::add_system_event_handler).
    pub fn add_system_event_handler_global<E: Event>(
        &mut self,
        name: impl Into<String>,
        callback: impl Fn(&mut EcsWorld, &mut E) + 'static,
        options: HandlerOptions,
    ) -> EcsResult<SystemHandle> {
        let erased: Rc<HandlerFn> = Rc::new(
            move |world: &mut EcsWorld, _entity: Option<EntityId>, event: &mut dyn Any| {
                if let Some(event) = event.downcast_mut::<E>() {
                    callback(world, event);
                }
            },
        );
        self.attach_handler::<E>(name.into(), None, erased, options)
    }

    fn attach_handler<E: Event>(
        &mut self,
        name: String,
        sample: Option<EntitiesSample>,
        callback: Rc<HandlerFn>,
        options: HandlerOptions,
    ) -> EcsResult<SystemHandle> {
        if self.state != EcsWorldState::Active {
            return Err(EcsError::WorldNotActive {
                world: self.name.clone(),
                state: self.state,
            });
        }
        if !options.tags.is_subset(&self.tags) {
            tracing::debug!(world = %self.name, system = %name, "system tags not supported");
            return Err(EcsError::TagsNotSupported {
                system: name,
                world: self.name.clone(),
            });
        }
        if sample.as_ref().is_some_and(|s| s.world_tag() != self.tag) {
            tracing::warn!(world = %self.name, system = %name, "sample belongs to another world");
            return Err(EcsError::ForeignSample { system: name });
        }

        let seq = self.next_handler_seq;
        self.next_handler_seq += 1;
        let handler = Rc::new(ComponentSystemEventHandler::new(
            name,
            TypeId::of::<E>(),
            type_name::<E>(),
            sample,
            options,
            seq,
            callback,
        ));

        let list = self.handlers.entry(TypeId::of::<E>()).or_default();
        if !list.insert(Rc::clone(&handler)) {
            tracing::warn!(
                world = %self.name,
                system = handler.name(),
                event = handler.event_name(),
                "system ordering cycle, registration rejected"
            );
            handler.detach();
            return Err(EcsError::SystemOrderCycle {
                system: handler.name().to_owned(),
                event: handler.event_name(),
            });
        }

        tracing::debug!(
            world = %self.name,
            system = handler.name(),
            event = handler.event_name(),
            "system attached"
        );
        Ok(SystemHandle::new(handler))
    }

    /// Unregisters a handler.
    ///
    /// # Returns
    ///
    /// `false` if the handler was not registered with this world.
    pub fn remove_system_event_handler(&mut self, handle: &SystemHandle) -> bool {
        let handler = handle.rc();
        let removed = self
            .handlers
            .get_mut(&handler.event_type())
            .is_some_and(|list| list.remove(handler));
        if removed {
            handler.detach();
            tracing::debug!(world = %self.name, system = handler.name(), "system detached");
        }
        removed
    }

    /// Names of the handlers of `E`, in dispatch order.
    #[must_use]
    pub fn systems<E: Event>(&self) -> Vec<String> {
        self.handlers
            .get(&TypeId::of::<E>())
            .map(|list| list.handlers().iter().map(|h| h.name().to_owned()).collect())
            .unwrap_or_default()
    }

    /// Finds a registered handler by name.
    #[must_use]
    pub fn find_system(&self, name: &str) -> Option<SystemHandle> {
        self.handlers
            .values()
            .flat_map(|list| list.handlers().iter())
            .find(|handler| handler.name() == name)
            .map(|handler| SystemHandle::new(Rc::clone(handler)))
    }

    /// Total number of registered handlers.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.handlers.values().map(|list| list.handlers().len()).sum()
    }

    pub(crate) fn detach_all_systems(&mut self) {
        let mut detached = 0usize;
        for list in self.handlers.values_mut() {
            for handler in list.drain() {
                handler.detach();
                detached += 1;
            }
        }
        self.handlers.clear();
        tracing::debug!(world = %self.name, detached, "systems detached");
    }

    // =========================================================================
    // Immediate delivery
    // =========================================================================

    /// Delivers `event` to every handler of `E` right away.
    pub fn broadcast_event_immediate<E: Event>(&mut self, event: &mut E) {
        self.dispatch(TypeId::of::<E>(), None, event, EcsEventParams::default());
    }

    /// Delivers `event` to the handlers whose sample contains `id`.
    pub fn send_event_immediate<E: Event>(&mut self, id: EntityId, event: &mut E) {
        self.send_event_immediate_with(id, event, EcsEventParams::default());
    }

    /// As [`send_event_immediate`](Self::send_event_immediate) with explicit params.
    pub fn send_event_immediate_with<E: Event>(
        &mut self,
        id: EntityId,
        event: &mut E,
        params: EcsEventParams,
    ) {
        if !self.check_owner(id, "send_event") {
            return;
        }
        if !self.table.contains(id) {
            if params.ignore_null_world_entity {
                tracing::trace!(world = %self.name, entity = %id, "send to unresolved entity dropped");
            } else {
                tracing::warn!(world = %self.name, entity = %id, event = type_name::<E>(), "send to unresolved entity");
            }
            return;
        }
        self.dispatch(TypeId::of::<E>(), Some(id), event, params);
    }

    // =========================================================================
    // Deferred delivery
    // =========================================================================

    fn accepts_deferred(&self) -> bool {
        matches!(
            self.state,
            EcsWorldState::Active | EcsWorldState::PreparingToDestroy
        )
    }

    /// Queues a broadcast for the next [`process_deferred_events`](Self::process_deferred_events).
    pub fn broadcast_event<E: Event>(&mut self, event: E) {
        if !self.accepts_deferred() {
            tracing::debug!(world = %self.name, state = ?self.state, "deferred broadcast dropped");
            return;
        }
        self.queue.push_event(DeferredEvent::new(None, event));
    }

    /// Queues a send for the next [`process_deferred_events`](Self::process_deferred_events).
    pub fn send_event<E: Event>(&mut self, id: EntityId, event: E) {
        if !self.check_owner(id, "send_event") {
            return;
        }
        if !self.accepts_deferred() {
            tracing::debug!(world = %self.name, state = ?self.state, "deferred send dropped");
            return;
        }
        self.queue.push_event(DeferredEvent::new(Some(id), event));
    }

    /// Switches the queue buffers and delivers everything queued before the
    /// switch, in FIFO order. Events queued meanwhile wait for the next call.
    pub fn process_deferred_events(&mut self) {
        if self.draining_events {
            tracing::debug!(world = %self.name, "nested deferred drain skipped");
            return;
        }
        self.draining_events = true;
        self.queue.switch_events();

        while let Some(deferred) = self.queue.pop_event() {
            let DeferredEvent {
                target,
                event_type,
                event_name,
                mut payload,
            } = deferred;
            tracing::trace!(world = %self.name, event = event_name, "deferred event");

            if let Some(id) = target {
                if !self.table.contains(id) {
                    tracing::trace!(world = %self.name, entity = %id, event = event_name, "deferred send target gone");
                    continue;
                }
            }
            self.dispatch(event_type, target, &mut *payload, EcsEventParams::default());
        }

        self.draining_events = false;
        self.service_destroy_request();
    }

    // =========================================================================
    // Core loop
    // =========================================================================

    fn accepts_target(&self, id: EntityId, params: EcsEventParams) -> bool {
        !(params.ignore_removing_entity && self.is_entity_removing(id))
    }

    fn dispatch(
        &mut self,
        event_type: TypeId,
        target: Option<EntityId>,
        event: &mut dyn Any,
        params: EcsEventParams,
    ) {
        let handlers: Vec<Rc<ComponentSystemEventHandler>> = match self.handlers.get(&event_type) {
            Some(list) if !list.handlers().is_empty() => list.handlers().to_vec(),
            _ => return,
        };

        self.dispatch_depth += 1;
        for handler in &handlers {
            if !handler.is_attached() {
                continue;
            }
            match (target, handler.sample()) {
                (None, None) => handler.invoke(self, None, event),
                (None, Some(sample)) => {
                    for id in sample.entity_ids() {
                        if handler.is_attached()
                            && sample.contains(id)
                            && self.accepts_target(id, params)
                        {
                            handler.invoke(self, Some(id), event);
                        }
                    }
                }
                (Some(id), Some(sample)) => {
                    if sample.contains(id) && self.accepts_target(id, params) {
                        handler.invoke(self, Some(id), event);
                    }
                }
                (Some(_), None) => {}
            }
        }
        self.end_dispatch();
    }

    /// Delivers a sample transition to the handlers bound to `sample`.
    pub(crate) fn notify_sample_handlers<E: Event + Default>(
        &mut self,
        sample: &EntitiesSample,
        id: EntityId,
    ) {
        let Some(list) = self.handlers.get(&TypeId::of::<E>()) else {
            return;
        };
        let handlers: Vec<Rc<ComponentSystemEventHandler>> = list
            .handlers()
            .iter()
            .filter(|handler| handler.sample().is_some_and(|s| s.ptr_eq(sample)))
            .cloned()
            .collect();
        if handlers.is_empty() {
            return;
        }

        let mut event = E::default();
        self.dispatch_depth += 1;
        for handler in &handlers {
            if handler.is_attached() {
                handler.invoke(self, Some(id), &mut event);
            }
        }
        self.end_dispatch();
    }

    fn end_dispatch(&mut self) {
        self.dispatch_depth -= 1;
        if self.dispatch_depth == 0 {
            self.flush_structural();
        }
    }
}
