//! # Engine Context
//!
//! Owns the worlds and the system definitions. There are no globals: code
//! that needs a world receives the context or the world explicitly.

use tessera_core::{EcsWorld, EcsWorldState};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::systems::SystemRegistry;

/// Named worlds plus the systems attached to them.
#[derive(Debug, Default)]
pub struct EngineContext {
    systems: SystemRegistry,
    /// Creation order is update order.
    worlds: Vec<EcsWorld>,
    default_world: Option<String>,
}

impl EngineContext {
    /// A context with no worlds.
    #[must_use]
    pub fn new(systems: SystemRegistry) -> Self {
        Self {
            systems,
            worlds: Vec::new(),
            default_world: None,
        }
    }

    /// Creates every configured world.
    ///
    /// # Errors
    ///
    /// - [`EngineError::DuplicateWorld`] if two worlds share a name
    /// - [`EngineError::UnknownWorld`] if `default_world` names no configured world
    /// - [`EngineError::Ecs`] if a system fails to attach
    pub fn from_config(config: &EngineConfig, systems: SystemRegistry) -> EngineResult<Self> {
        let mut context = Self::new(systems);
        for world in &config.worlds {
            let created = context.create_world(&world.name, world.attach_systems, world.tags.as_slice())?;
            created.reserve_entity_indices(world.reserve_entities);
        }
        if let Some(name) = config.default_world_name() {
            context.set_default_world(name)?;
        }
        tracing::info!(worlds = context.worlds.len(), "engine context ready");
        Ok(context)
    }

    /// System definitions attached to new worlds.
    #[must_use]
    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    /// Mutable system definitions. Changes apply to worlds created afterwards.
    pub fn systems_mut(&mut self) -> &mut SystemRegistry {
        &mut self.systems
    }

    /// Creates a world.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique name within this context
    /// * `attach_systems` - Attach the registered systems whose tags the world carries
    /// * `tags` - World tags
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicateWorld`] if the name is taken, or
    /// [`EngineError::Ecs`] if no world tag is free or a system fails to
    /// attach. The world is not kept in any of these cases.
    pub fn create_world<S: AsRef<str>>(
        &mut self,
        name: &str,
        attach_systems: bool,
        tags: &[S],
    ) -> EngineResult<&mut EcsWorld> {
        if self.world(name).is_some() {
            return Err(EngineError::DuplicateWorld(name.to_owned()));
        }

        let mut world = EcsWorld::create(name, tags.iter().map(|tag| tag.as_ref().to_owned()))?;
        if attach_systems {
            let handles = self.systems.attach_to(&mut world)?;
            tracing::debug!(world = name, systems = handles.len(), "systems attached");
        }

        if self.default_world.is_none() {
            self.default_world = Some(name.to_owned());
        }
        let index = self.worlds.len();
        self.worlds.push(world);
        Ok(&mut self.worlds[index])
    }

    /// World by name.
    #[must_use]
    pub fn world(&self, name: &str) -> Option<&EcsWorld> {
        self.worlds.iter().find(|world| world.name() == name)
    }

    /// Mutable world by name.
    pub fn world_mut(&mut self, name: &str) -> Option<&mut EcsWorld> {
        self.worlds.iter_mut().find(|world| world.name() == name)
    }

    /// Names of all worlds, in update order.
    #[must_use]
    pub fn world_names(&self) -> Vec<&str> {
        self.worlds.iter().map(EcsWorld::name).collect()
    }

    /// Number of worlds.
    #[must_use]
    pub fn world_count(&self) -> usize {
        self.worlds.len()
    }

    /// Name of the default world.
    #[must_use]
    pub fn default_world_name(&self) -> Option<&str> {
        self.default_world.as_deref()
    }

    /// Makes `name` the default world.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownWorld`] if no such world exists.
    pub fn set_default_world(&mut self, name: &str) -> EngineResult<()> {
        if self.world(name).is_none() {
            return Err(EngineError::UnknownWorld(name.to_owned()));
        }
        self.default_world = Some(name.to_owned());
        Ok(())
    }

    /// The default world: the configured one, else the first created.
    pub fn default_world_mut(&mut self) -> Option<&mut EcsWorld> {
        let name = self.default_world.clone()?;
        self.world_mut(&name)
    }

    /// Destroys and drops a world.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownWorld`] if no such world exists.
    pub fn destroy_world(&mut self, name: &str) -> EngineResult<()> {
        let index = self
            .worlds
            .iter()
            .position(|world| world.name() == name)
            .ok_or_else(|| EngineError::UnknownWorld(name.to_owned()))?;
        let mut world = self.worlds.remove(index);
        world.destroy();
        self.forget_default(name);
        tracing::debug!(world = name, "world destroyed");
        Ok(())
    }

    /// Updates every active world once, in creation order.
    ///
    /// Destroyed worlds are dropped afterwards, whether they destroyed
    /// themselves during the update or were destroyed through
    /// [`world_mut`](Self::world_mut) since the last frame. Pruning also
    /// runs when a world update fails.
    ///
    /// # Errors
    ///
    /// The first world update error. Later worlds are not updated that frame.
    pub fn update(&mut self, dt: f32) -> EngineResult<()> {
        let result = self
            .worlds
            .iter_mut()
            .filter(|world| world.is_active())
            .try_for_each(|world| world.update(dt));
        self.prune_destroyed();
        result.map_err(EngineError::from)
    }

    fn prune_destroyed(&mut self) {
        let mut destroyed = Vec::new();
        self.worlds.retain(|world| {
            let alive = world.state() != EcsWorldState::Destroyed;
            if !alive {
                destroyed.push(world.name().to_owned());
            }
            alive
        });
        for name in destroyed {
            tracing::debug!(world = %name, "destroyed world dropped");
            self.forget_default(&name);
        }
    }

    fn forget_default(&mut self, name: &str) {
        if self.default_world.as_deref() == Some(name) {
            self.default_world = self.worlds.first().map(|world| world.name().to_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::systems::SystemDescriptor;
    use tessera_core::{HandlerOptions, UpdateEvent};

    #[test]
    fn test_create_and_lookup() {
        let mut context = EngineContext::default();
        context.create_world("game", true, &["render"]).unwrap();
        context.create_world::<&str>("ui", false, &[]).unwrap();

        assert_eq!(context.world_names(), vec!["game", "ui"]);
        assert!(context.world("game").unwrap().has_tag("render"));
        assert_eq!(context.default_world_name(), Some("game"));
        assert!(matches!(
            context.create_world::<&str>("game", false, &[]),
            Err(EngineError::DuplicateWorld(_))
        ));
    }

    #[test]
    fn test_destroy_world_moves_default() {
        let mut context = EngineContext::default();
        context.create_world::<&str>("a", false, &[]).unwrap();
        context.create_world::<&str>("b", false, &[]).unwrap();

        context.destroy_world("a").unwrap();
        assert_eq!(context.default_world_name(), Some("b"));
        assert!(matches!(
            context.destroy_world("a"),
            Err(EngineError::UnknownWorld(_))
        ));
    }

    #[test]
    fn test_self_destroying_world_is_dropped_after_update() {
        let mut systems = SystemRegistry::new();
        systems.register(SystemDescriptor::global::<UpdateEvent, _>(
            "quit",
            |world, _| world.destroy(),
            HandlerOptions::new().with_tag("ephemeral"),
        ));
        let mut context = EngineContext::new(systems);
        context.create_world::<&str>("main", true, &[]).unwrap();
        context.create_world("splash", true, &["ephemeral"]).unwrap();

        context.update(0.016).unwrap();
        assert_eq!(context.world_names(), vec!["main"]);
        assert_eq!(context.world("main").unwrap().frame(), 1);
    }

    #[test]
    fn test_world_destroyed_between_frames_is_pruned() {
        let mut context = EngineContext::default();
        context.create_world::<&str>("menu", false, &[]).unwrap();
        context.create_world::<&str>("game", false, &[]).unwrap();

        context.world_mut("menu").unwrap().destroy();
        assert_eq!(context.world_count(), 2);

        context.update(0.016).unwrap();
        assert_eq!(context.world_names(), vec!["game"]);
        assert_eq!(context.default_world_name(), Some("game"));
        assert_eq!(context.world("game").unwrap().frame(), 1);

        // The name is free again once the destroyed world is gone.
        assert!(context.create_world::<&str>("menu", false, &[]).is_ok());
    }

    #[test]
    fn test_from_config_reserves_and_sets_default() {
        let config = EngineConfig {
            default_world: Some("second".to_owned()),
            worlds: vec![
                WorldConfig {
                    name: "first".to_owned(),
                    tags: Vec::new(),
                    attach_systems: true,
                    reserve_entities: 0,
                },
                WorldConfig {
                    name: "second".to_owned(),
                    tags: vec!["render".to_owned()],
                    attach_systems: false,
                    reserve_entities: 16,
                },
            ],
        };
        let mut context = EngineContext::from_config(&config, SystemRegistry::new()).unwrap();
        let world = context.default_world_mut().unwrap();
        assert_eq!(world.name(), "second");
        assert_eq!(world.create_entity().unwrap().index(), 0);
    }

    #[test]
    fn test_from_config_unknown_default() {
        let config = EngineConfig {
            default_world: Some("missing".to_owned()),
            worlds: Vec::new(),
        };
        assert!(matches!(
            EngineContext::from_config(&config, SystemRegistry::new()),
            Err(EngineError::UnknownWorld(_))
        ));
    }
}
