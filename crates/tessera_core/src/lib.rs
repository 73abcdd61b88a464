//! # TESSERA Core Engine
//!
//! The Entity Component System at the heart of the engine. Every other
//! subsystem (rendering, physics, UI, editor tooling) consumes the invariants
//! this crate maintains:
//! - Entity identity: generation-tagged ids, recycled through a LIFO free-list
//! - Live queries: samples kept in sync with every entity mutation
//! - Event dispatch: ordered handlers, immediate and double-buffered delivery
//!
//! ## Architecture Rules
//!
//! 1. **Single owner** - one `EcsWorld` is updated from one thread, no per-world locks
//! 2. **Re-entrant** - handlers may call back into the world while it iterates
//! 3. **Never fatal** - misuse is logged and degrades to an empty result
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{EcsWorld, Entity, SampleFlags};
//!
//! let mut world = EcsWorld::new("game")?;
//! let sample = world.request_inclusive_sample::<(Position,)>(SampleFlags::NONE);
//! let id = world.add_entity(Entity::new().with_component(Position::default()))?;
//! assert!(sample.contains(id));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod ecs;
pub mod error;
pub mod serialization;
pub mod sync;

pub use ecs::{
    AspectKind, Component, ComponentId, ComponentInfo, ComponentMask, ComponentRegistry,
    ComponentSet, ComponentSystemEventHandler, EcsEventParams, EcsWorld, EcsWorldState,
    EcsWorldWillBeDestroyedEvent, EntitiesSample, Entity, EntityActiveChangedEvent,
    EntityAddedEvent, EntityAddedToSampleEvent, EntityAspect, EntityId, EntityRemovedEvent,
    EntityRemovedFromSampleEvent, Event, HandlerOptions, PostUpdateEvent, PreUpdateEvent,
    SampleFlags, SampleKind, Subscription, SystemHandle, SystemOrder, UpdateEvent,
};
pub use error::{EcsError, EcsResult};
pub use serialization::{DataBlock, EntitySerializationMap};
pub use sync::SwitchableContainer;
