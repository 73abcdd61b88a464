//! # ECS Error Types
//!
//! Contract violations reported by the world. Missing data (unknown ids,
//! empty handler lists) is never an error: those paths return `None`,
//! `false` or an empty collection instead.

use thiserror::Error;

use crate::ecs::{EcsWorldState, EntityId};

/// Errors that can occur while operating on an [`EcsWorld`](crate::EcsWorld).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The world is not in a state that accepts this operation.
    #[error("world '{world}' is {state:?}, operation rejected")]
    WorldNotActive {
        /// Name of the world.
        world: String,
        /// State the world was in.
        state: EcsWorldState,
    },

    /// The entity id was minted by a different world.
    #[error("entity {0} belongs to another world")]
    ForeignEntity(EntityId),

    /// The entity id does not resolve to a live entity.
    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The entity already owns a component with this id.
    #[error("entity {entity} already has component '{component}'")]
    DuplicateComponent {
        /// Entity that owns the component.
        entity: EntityId,
        /// Registered component name.
        component: String,
    },

    /// Registering the system would create a cycle in the before/after constraints.
    #[error("system '{system}' creates an ordering cycle for event '{event}'")]
    SystemOrderCycle {
        /// Name of the rejected system.
        system: String,
        /// Event type the system handles.
        event: &'static str,
    },

    /// The system requires tags that the world does not carry.
    #[error("system '{system}' requires tags the world '{world}' does not have")]
    TagsNotSupported {
        /// Name of the rejected system.
        system: String,
        /// Name of the world.
        world: String,
    },

    /// The sample passed at registration was created by another world.
    #[error("system '{system}' was given a sample owned by another world")]
    ForeignSample {
        /// Name of the rejected system.
        system: String,
    },

    /// Every world tag is held by a live world.
    #[error("cannot create world '{0}': all world tags are in use")]
    WorldTagsExhausted(String),

    /// The serialization map has handed out every serial id.
    #[error("entity serial ids exhausted")]
    SerialIdsExhausted,

    /// `update` was called while the world was already updating.
    #[error("world '{0}' is already updating")]
    AlreadyUpdating(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
