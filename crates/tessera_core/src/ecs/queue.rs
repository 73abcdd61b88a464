//! # World Events Queue
//!
//! Two kinds of pending work:
//! - Structural operations (entity adds and removals), flushed FIFO at the
//!   next flush point
//! - Deferred events, double-buffered so a drain never sees events posted
//!   during that drain

use std::collections::VecDeque;

use super::entity::{Entity, EntityId};
use super::event::DeferredEvent;
use crate::sync::SwitchableContainer;

/// A queued structural change.
pub(crate) enum StructuralOp {
    /// Add an entity under an already allocated id. `None` means the add
    /// was cancelled and only the id must be released.
    Add {
        id: EntityId,
        entity: Option<Entity>,
    },
    /// Complete the removal of an entity marked `removing`.
    Remove(EntityId),
}

/// Pending structural operations and deferred events.
#[derive(Default)]
pub(crate) struct EcsWorldEventsQueue {
    structural: VecDeque<StructuralOp>,
    events: SwitchableContainer<VecDeque<DeferredEvent>>,
}

impl EcsWorldEventsQueue {
    pub(crate) fn push_add(&mut self, id: EntityId, entity: Entity) {
        self.structural.push_back(StructuralOp::Add {
            id,
            entity: Some(entity),
        });
    }

    pub(crate) fn push_remove(&mut self, id: EntityId) {
        self.structural.push_back(StructuralOp::Remove(id));
    }

    pub(crate) fn pop_structural(&mut self) -> Option<StructuralOp> {
        self.structural.pop_front()
    }

    /// The queued, not yet cancelled entity for a pending id.
    pub(crate) fn pending_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.structural.iter_mut().find_map(|op| match op {
            StructuralOp::Add {
                id: pending,
                entity,
            } if *pending == id => entity.as_mut(),
            _ => None,
        })
    }

    /// Cancels a queued add and returns its entity.
    pub(crate) fn take_pending_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.structural.iter_mut().find_map(|op| match op {
            StructuralOp::Add {
                id: pending,
                entity,
            } if *pending == id => entity.take(),
            _ => None,
        })
    }

    pub(crate) fn push_event(&mut self, event: DeferredEvent) {
        self.events.current_mut().push_back(event);
    }

    /// Flips the event buffers. Events queued so far become drainable.
    pub(crate) fn switch_events(&mut self) {
        self.events.switch();
    }

    /// Next event from the drainable buffer.
    pub(crate) fn pop_event(&mut self) -> Option<DeferredEvent> {
        self.events.other_mut().pop_front()
    }

    pub(crate) fn pending_event_count(&self) -> usize {
        self.events.current().len() + self.events.other().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::event::UpdateEvent;

    #[test]
    fn test_events_posted_after_switch_wait_for_next_cycle() {
        let mut queue = EcsWorldEventsQueue::default();
        queue.push_event(DeferredEvent::new(None, UpdateEvent { dt: 1.0 }));
        queue.switch_events();
        queue.push_event(DeferredEvent::new(None, UpdateEvent { dt: 2.0 }));

        assert!(queue.pop_event().is_some());
        assert!(queue.pop_event().is_none());
        assert_eq!(queue.pending_event_count(), 1);
    }

    #[test]
    fn test_cancel_pending_add() {
        let mut queue = EcsWorldEventsQueue::default();
        let id = EntityId::new(0, 0, 1);
        queue.push_add(id, Entity::new());

        assert!(queue.pending_entity_mut(id).is_some());
        assert!(queue.take_pending_entity(id).is_some());
        assert!(queue.take_pending_entity(id).is_none());
        assert!(matches!(
            queue.pop_structural(),
            Some(StructuralOp::Add { entity: None, .. })
        ));
    }
}
