//! # Entity Component System
//!
//! The world owns entity identity, component storage, samples and event
//! dispatch.
//!
//! ## Design Philosophy
//!
//! - Entity ids are indices with generation counters, recycled LIFO
//! - Samples are maintained incrementally, never rebuilt per query
//! - Structural changes requested during dispatch wait for the next flush point
//! - Handlers reach component data through the world, never through cached references

mod aspect;
mod component;
mod dispatch;
mod entity;
mod event;
mod handler;
mod mask;
mod queue;
mod sample;
mod signal;
mod table;
mod world;
mod world_tag;

pub use aspect::{AspectKind, EntityAspect};
pub use component::{Component, ComponentId, ComponentInfo, ComponentRegistry, ComponentSet};
pub use entity::{Entity, EntityId};
pub use event::{
    EcsEventParams, EcsWorldWillBeDestroyedEvent, EntityActiveChangedEvent, EntityAddedEvent,
    EntityAddedToSampleEvent, EntityRemovedEvent, EntityRemovedFromSampleEvent, Event,
    PostUpdateEvent, PreUpdateEvent, UpdateEvent,
};
pub use handler::{ComponentSystemEventHandler, HandlerOptions, SystemHandle, SystemOrder};
pub use mask::ComponentMask;
pub use sample::{EntitiesSample, SampleFlags, SampleKind};
pub use signal::Subscription;
pub use world::{EcsWorld, EcsWorldState};
