//! # ECS Events
//!
//! Events are plain values dispatched to handlers registered for their type.
//! The world emits the core lifecycle events below; games define their own by
//! implementing [`Event`].

use std::any::{type_name, Any, TypeId};

use super::entity::EntityId;

/// Marker trait for event types.
pub trait Event: Any {}

/// Delivery options for entity-targeted sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcsEventParams {
    /// Skip entities that are scheduled for removal.
    pub ignore_removing_entity: bool,
    /// Drop sends to ids that do not resolve to a live entity without
    /// reporting them. When false such sends are logged as warnings.
    pub ignore_null_world_entity: bool,
}

impl EcsEventParams {
    /// Params that reach entities in every lifecycle state.
    pub const UNFILTERED: Self = Self {
        ignore_removing_entity: false,
        ignore_null_world_entity: false,
    };
}

impl Default for EcsEventParams {
    fn default() -> Self {
        Self {
            ignore_removing_entity: true,
            ignore_null_world_entity: true,
        }
    }
}

// =============================================================================
// Core events
// =============================================================================

/// Broadcast at the start of every update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreUpdateEvent {
    /// Frame delta time in seconds.
    pub dt: f32,
}

/// Broadcast once per update, after [`PreUpdateEvent`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateEvent {
    /// Frame delta time in seconds.
    pub dt: f32,
}

/// Broadcast at the end of every update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostUpdateEvent {
    /// Frame delta time in seconds.
    pub dt: f32,
}

/// Sent to an entity once it has joined the world and its samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityAddedEvent;

/// Sent to an entity right before it leaves its samples and the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityRemovedEvent;

/// Sent to an entity when its active flag changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityActiveChangedEvent {
    /// The new active state.
    pub active: bool,
}

/// Delivered to a handler when an entity enters the handler's sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityAddedToSampleEvent;

/// Delivered to a handler when an entity leaves the handler's sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntityRemovedFromSampleEvent;

/// Broadcast once when the world starts shutting down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EcsWorldWillBeDestroyedEvent;

impl Event for PreUpdateEvent {}
impl Event for UpdateEvent {}
impl Event for PostUpdateEvent {}
impl Event for EntityAddedEvent {}
impl Event for EntityRemovedEvent {}
impl Event for EntityActiveChangedEvent {}
impl Event for EntityAddedToSampleEvent {}
impl Event for EntityRemovedFromSampleEvent {}
impl Event for EcsWorldWillBeDestroyedEvent {}

/// A type-erased event waiting in the deferred queue.
pub(crate) struct DeferredEvent {
    pub(crate) target: Option<EntityId>,
    pub(crate) event_type: TypeId,
    pub(crate) event_name: &'static str,
    pub(crate) payload: Box<dyn Any>,
}

impl DeferredEvent {
    pub(crate) fn new<E: Event>(target: Option<EntityId>, event: E) -> Self {
        Self {
            target,
            event_type: TypeId::of::<E>(),
            event_name: type_name::<E>(),
            payload: Box::new(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_filter() {
        let params = EcsEventParams::default();
        assert!(params.ignore_removing_entity);
        assert!(params.ignore_null_world_entity);
        assert!(!EcsEventParams::UNFILTERED.ignore_removing_entity);
    }

    #[test]
    fn test_deferred_event_keeps_type() {
        let mut deferred = DeferredEvent::new(None, UpdateEvent { dt: 0.5 });
        assert_eq!(deferred.event_type, TypeId::of::<UpdateEvent>());
        let event = deferred.payload.downcast_mut::<UpdateEvent>();
        assert_eq!(event.map(|e| e.dt), Some(0.5));
    }
}
