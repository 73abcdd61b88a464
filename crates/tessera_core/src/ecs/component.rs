//! # Components
//!
//! Components are plain data attached to entities. Static components are Rust
//! types implementing [`Component`]; dynamic components (script-defined types
//! with no Rust counterpart) are registered by name.
//!
//! Each world owns a [`ComponentRegistry`] that hands out dense
//! [`ComponentId`]s on first use. Ids are only meaningful within the world
//! that assigned them.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Marker trait for component types.
///
/// # Capabilities
///
/// A component can advertise string capabilities ("is-a" tags) so systems can
/// query by role instead of by concrete type:
///
/// ```rust,ignore
/// struct MeshRenderer;
/// impl Component for MeshRenderer {
///     const CAPABILITIES: &'static [&'static str] = &["renderable"];
/// }
/// ```
pub trait Component: Any {
    /// Capability tags advertised by this component type.
    const CAPABILITIES: &'static [&'static str] = &[];
}

/// Dense per-world component identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// Returns the id as a bit index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Key identifying a component kind before it is registered in a world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ComponentKey {
    /// A Rust type.
    Static {
        type_id: TypeId,
        name: &'static str,
        capabilities: &'static [&'static str],
    },
    /// A script-defined type, keyed by name.
    Dynamic(String),
}

impl ComponentKey {
    pub(crate) fn of<T: Component>() -> Self {
        Self::Static {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
            capabilities: T::CAPABILITIES,
        }
    }

    pub(crate) fn type_id(&self) -> Option<TypeId> {
        match self {
            Self::Static { type_id, .. } => Some(*type_id),
            Self::Dynamic(_) => None,
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Static { name, .. } => *name,
            Self::Dynamic(name) => name.as_str(),
        }
    }
}

/// Registry metadata for one component kind.
#[derive(Clone, Debug)]
pub struct ComponentInfo {
    id: ComponentId,
    key: ComponentKey,
    capabilities: Vec<String>,
}

impl ComponentInfo {
    /// Id assigned by the registry.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Type name for static components, registered name for dynamic ones.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.key.name()
    }

    /// Rust type id, `None` for dynamic components.
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> Option<TypeId> {
        self.key.type_id()
    }

    /// Whether this component was registered by name.
    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self.key, ComponentKey::Dynamic(_))
    }

    /// Capability tags.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub(crate) fn key(&self) -> &ComponentKey {
        &self.key
    }
}

/// Per-world table of component kinds.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    infos: Vec<ComponentInfo>,
    by_type: HashMap<TypeId, ComponentId>,
    by_name: HashMap<String, ComponentId>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `T`, registering it on first use.
    pub fn register<T: Component>(&mut self) -> ComponentId {
        self.register_key(&ComponentKey::of::<T>())
    }

    /// Returns the id of a dynamic component, registering it on first use.
    ///
    /// Capabilities are only recorded on the first registration.
    pub fn register_dynamic(&mut self, name: &str, capabilities: &[&str]) -> ComponentId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.push(
            ComponentKey::Dynamic(name.to_owned()),
            capabilities.iter().map(|c| (*c).to_owned()).collect(),
        );
        self.by_name.insert(name.to_owned(), id);
        id
    }

    pub(crate) fn register_key(&mut self, key: &ComponentKey) -> ComponentId {
        match key {
            ComponentKey::Static {
                type_id,
                name,
                capabilities,
            } => {
                if let Some(&id) = self.by_type.get(type_id) {
                    return id;
                }
                let id = self.push(
                    key.clone(),
                    capabilities.iter().map(|c| (*c).to_owned()).collect(),
                );
                self.by_type.insert(*type_id, id);
                self.by_name.entry((*name).to_owned()).or_insert(id);
                id
            }
            ComponentKey::Dynamic(name) => self.register_dynamic(name, &[]),
        }
    }

    fn push(&mut self, key: ComponentKey, capabilities: Vec<String>) -> ComponentId {
        #[allow(clippy::cast_possible_truncation)]
        let id = ComponentId(self.infos.len() as u32);
        tracing::trace!(component = key.name(), id = id.0, "component registered");
        self.infos.push(ComponentInfo {
            id,
            key,
            capabilities,
        });
        id
    }

    /// Looks up the id of `T` without registering it.
    #[inline]
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Looks up a component id by name (dynamic name or Rust type name).
    #[inline]
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    /// Returns metadata for a component id.
    #[inline]
    #[must_use]
    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    /// Name of a component id, or `"<unknown>"`.
    #[must_use]
    pub fn name_of(&self, id: ComponentId) -> &str {
        self.info(id).map_or("<unknown>", ComponentInfo::name)
    }

    /// Checks whether a component advertises `capability`.
    #[must_use]
    pub fn has_capability(&self, id: ComponentId, capability: &str) -> bool {
        self.info(id)
            .is_some_and(|info| info.capabilities.iter().any(|c| c == capability))
    }

    /// All registered components advertising `capability`.
    #[must_use]
    pub fn ids_with_capability(&self, capability: &str) -> Vec<ComponentId> {
        self.infos
            .iter()
            .filter(|info| info.capabilities.iter().any(|c| c == capability))
            .map(|info| info.id)
            .collect()
    }

    /// Number of registered components.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns true if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

/// A statically known set of component types, implemented for tuples.
///
/// Used by [`EcsWorld::request_inclusive_sample`](super::EcsWorld::request_inclusive_sample)
/// to build a "has all of" aspect from type parameters.
pub trait ComponentSet: 'static {
    /// Registers every member type and returns their ids.
    fn register(registry: &mut ComponentRegistry) -> Vec<ComponentId>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn register(registry: &mut ComponentRegistry) -> Vec<ComponentId> {
                vec![$(registry.register::<$name>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    struct Position;
    impl Component for Position {}

    struct MeshRenderer;
    impl Component for MeshRenderer {
        const CAPABILITIES: &'static [&'static str] = &["renderable"];
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register::<Position>();
        let b = registry.register::<Position>();
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.id_of::<Position>(), Some(a));
    }

    #[test]
    fn test_dynamic_components_get_distinct_ids() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();
        let health = registry.register_dynamic("Health", &["damageable"]);
        assert_ne!(pos, health);
        assert_eq!(registry.register_dynamic("Health", &[]), health);
        assert!(registry.info(health).is_some_and(ComponentInfo::is_dynamic));
        assert_eq!(registry.id_by_name("Health"), Some(health));
    }

    #[test]
    fn test_capabilities() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();
        let mesh = registry.register::<MeshRenderer>();
        let sprite = registry.register_dynamic("Sprite", &["renderable"]);

        assert!(registry.has_capability(mesh, "renderable"));
        assert!(!registry.has_capability(pos, "renderable"));
        assert_eq!(registry.ids_with_capability("renderable"), vec![mesh, sprite]);
    }

    #[test]
    fn test_component_set_registers_all() {
        let mut registry = ComponentRegistry::new();
        let ids = <(Position, MeshRenderer)>::register(&mut registry);
        assert_eq!(ids.len(), 2);
        assert_eq!(registry.len(), 2);
    }
}
