//! # System Registry
//!
//! Systems are declared once on the [`EngineContext`](crate::EngineContext)
//! and attached to every world created with `attach_systems`. A descriptor
//! whose tags a world does not carry is skipped for that world.

use std::any::type_name;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use tessera_core::{
    ComponentSet, EcsError, EcsResult, EcsWorld, EntityId, Event, HandlerOptions, SystemHandle,
    SystemOrder,
};

use crate::error::EngineResult;

type AttachFn = dyn Fn(&mut EcsWorld, &str, HandlerOptions) -> EcsResult<SystemHandle>;

/// A system definition that can be attached to any number of worlds.
#[derive(Clone)]
pub struct SystemDescriptor {
    name: String,
    event_name: &'static str,
    options: HandlerOptions,
    attach: Rc<AttachFn>,
}

impl SystemDescriptor {
    /// A system called once per entity of the inclusive sample of `S`.
    #[must_use]
    pub fn for_entities<E, S, F>(name: impl Into<String>, callback: F, options: HandlerOptions) -> Self
    where
        E: Event,
        S: ComponentSet,
        F: Fn(&mut EcsWorld, EntityId, &mut E) + 'static,
    {
        let callback = Rc::new(callback);
        let attach = move |world: &mut EcsWorld, name: &str, options: HandlerOptions| {
            let callback = Rc::clone(&callback);
            world.add_system_event_handler::<E, S>(
                name,
                move |world, id, event| callback(world, id, event),
                options,
            )
        };
        Self {
            name: name.into(),
            event_name: type_name::<E>(),
            options,
            attach: Rc::new(attach),
        }
    }

    /// A system called once per broadcast of `E`.
    #[must_use]
    pub fn global<E, F>(name: impl Into<String>, callback: F, options: HandlerOptions) -> Self
    where
        E: Event,
        F: Fn(&mut EcsWorld, &mut E) + 'static,
    {
        let callback = Rc::new(callback);
        let attach = move |world: &mut EcsWorld, name: &str, options: HandlerOptions| {
            let callback = Rc::clone(&callback);
            world.add_system_event_handler_global::<E>(
                name,
                move |world, event| callback(world, event),
                options,
            )
        };
        Self {
            name: name.into(),
            event_name: type_name::<E>(),
            options,
            attach: Rc::new(attach),
        }
    }

    /// System name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type name of the handled event.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        self.event_name
    }

    /// World tags required to attach.
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.options.tags
    }

    /// Ordering constraints.
    #[inline]
    #[must_use]
    pub fn order(&self) -> &SystemOrder {
        &self.options.order
    }

    /// Registers this system in `world`.
    ///
    /// # Errors
    ///
    /// Whatever the world reports for the registration.
    pub fn attach(&self, world: &mut EcsWorld) -> EcsResult<SystemHandle> {
        (self.attach)(world, &self.name, self.options.clone())
    }
}

impl fmt::Debug for SystemDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemDescriptor")
            .field("name", &self.name)
            .field("event", &self.event_name)
            .field("tags", &self.options.tags)
            .field("order", &self.options.order)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of system descriptors.
#[derive(Clone, Debug, Default)]
pub struct SystemRegistry {
    descriptors: Vec<SystemDescriptor>,
}

impl SystemRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor. Descriptors attach in registration order.
    pub fn register(&mut self, descriptor: SystemDescriptor) -> &mut Self {
        tracing::debug!(system = %descriptor.name, event = descriptor.event_name, "system registered");
        self.descriptors.push(descriptor);
        self
    }

    /// Registered descriptors, in registration order.
    #[must_use]
    pub fn descriptors(&self) -> &[SystemDescriptor] {
        &self.descriptors
    }

    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Attaches every descriptor whose tags `world` carries.
    ///
    /// # Returns
    ///
    /// Handles of the attached systems, in registration order.
    ///
    /// # Errors
    ///
    /// Stops at the first registration the world rejects for a reason other
    /// than missing tags. Systems attached before the failure stay attached.
    pub fn attach_to(&self, world: &mut EcsWorld) -> EngineResult<Vec<SystemHandle>> {
        let mut handles = Vec::with_capacity(self.descriptors.len());
        for descriptor in &self.descriptors {
            match descriptor.attach(world) {
                Ok(handle) => handles.push(handle),
                Err(EcsError::TagsNotSupported { .. }) => {
                    tracing::debug!(
                        world = %world.name(),
                        system = %descriptor.name,
                        "system skipped, world lacks required tags"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tessera_core::{Component, Entity, UpdateEvent};

    struct Spin;
    impl Component for Spin {}

    #[test]
    fn test_descriptor_attaches_to_many_worlds() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let spin = SystemDescriptor::for_entities::<UpdateEvent, (Spin,), _>(
            "spin",
            move |_, _, _| counter.set(counter.get() + 1),
            HandlerOptions::new(),
        );

        let mut first = EcsWorld::new("first").unwrap();
        let mut second = EcsWorld::new("second").unwrap();
        spin.attach(&mut first).unwrap();
        spin.attach(&mut second).unwrap();
        first.add_entity(Entity::new().with_component(Spin)).unwrap();
        second.add_entity(Entity::new().with_component(Spin)).unwrap();

        first.update(0.1).unwrap();
        second.update(0.1).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(spin.event_name(), type_name::<UpdateEvent>());
    }

    #[test]
    fn test_attach_to_skips_untagged_worlds() {
        let mut registry = SystemRegistry::new();
        registry
            .register(SystemDescriptor::global::<UpdateEvent, _>(
                "everywhere",
                |_, _| {},
                HandlerOptions::new(),
            ))
            .register(SystemDescriptor::global::<UpdateEvent, _>(
                "render-only",
                |_, _| {},
                HandlerOptions::new().with_tag("render"),
            ));

        let mut plain = EcsWorld::new("plain").unwrap();
        let handles = registry.attach_to(&mut plain).unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].name(), "everywhere");

        let mut render = EcsWorld::create("render", ["render"]).unwrap();
        assert_eq!(registry.attach_to(&mut render).unwrap().len(), 2);
    }

    #[test]
    fn test_attach_to_reports_cycles() {
        let mut registry = SystemRegistry::new();
        registry
            .register(SystemDescriptor::global::<UpdateEvent, _>(
                "a",
                |_, _| {},
                HandlerOptions::new().before("b"),
            ))
            .register(SystemDescriptor::global::<UpdateEvent, _>(
                "b",
                |_, _| {},
                HandlerOptions::new().before("a"),
            ));

        let mut world = EcsWorld::new("cyclic").unwrap();
        let result = registry.attach_to(&mut world);
        assert!(matches!(
            result,
            Err(crate::EngineError::Ecs(EcsError::SystemOrderCycle { .. }))
        ));
        assert_eq!(world.system_count(), 1);
    }
}
