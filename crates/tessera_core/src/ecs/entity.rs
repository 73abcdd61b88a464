//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into the world's slot table
//! - A generation counter for safe reuse
//! - The tag of the world that minted them
//!
//! An [`Entity`] value is the *detached* form: a bag of components that is not
//! part of any world yet. Adding it to a world moves the components into the
//! world's table and yields an [`EntityId`].

use std::any::{Any, TypeId};
use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::component::{Component, ComponentKey};

/// Unique identifier for an entity.
///
/// The ID is split into three parts:
/// - Lower 32 bits: Index into the world's slot table
/// - Bits 32..48: Generation counter for detecting stale references
/// - Upper 16 bits: Tag of the world that allocated the id
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(transparent)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates a new entity ID from its parts.
    ///
    /// # Arguments
    ///
    /// * `index` - The slot index (0 to 2^32-1)
    /// * `generation` - The generation counter (0 to 2^16-1)
    /// * `world` - The tag of the owning world
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u16, world: u16) -> Self {
        Self(((world as u64) << 48) | ((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn generation(self) -> u16 {
        (self.0 >> 32) as u16
    }

    /// Returns the tag of the world that allocated this ID.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn world_tag(self) -> u16 {
        (self.0 >> 48) as u16
    }

    /// Checks if this entity ID is null/invalid.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }

    /// Raw packed representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Rebuilds an ID from its packed representation.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("EntityId(NULL)");
        }
        write!(
            f,
            "EntityId({}v{}@{})",
            self.index(),
            self.generation(),
            self.world_tag()
        )
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("null");
        }
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// A detached entity: components waiting to be added to a world.
///
/// # Example
///
/// ```rust,ignore
/// let entity = Entity::new()
///     .with_component(Position::new(1.0, 2.0, 3.0))
///     .with_component(Velocity::default());
/// let id = world.add_entity(entity)?;
/// ```
pub struct Entity {
    pub(crate) components: Vec<(ComponentKey, Box<dyn Any>)>,
    pub(crate) active_self: bool,
}

impl Entity {
    /// Creates an empty, active entity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            active_self: true,
        }
    }

    /// Attaches a component, replacing any previous component of the same type.
    #[must_use]
    pub fn with_component<T: Component>(mut self, component: T) -> Self {
        self.insert(ComponentKey::of::<T>(), Box::new(component));
        self
    }

    /// Attaches a dynamically typed component registered under `name`.
    #[must_use]
    pub fn with_dynamic_component(mut self, name: impl Into<String>, component: Box<dyn Any>) -> Self {
        self.insert(ComponentKey::Dynamic(name.into()), component);
        self
    }

    /// Sets whether the entity starts active.
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active_self = active;
        self
    }

    /// Returns whether the entity is active.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active_self
    }

    /// Number of attached components.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Gets a component by type.
    #[must_use]
    pub fn component<T: Component>(&self) -> Option<&T> {
        let type_id = TypeId::of::<T>();
        self.components
            .iter()
            .find(|(key, _)| key.type_id() == Some(type_id))
            .and_then(|(_, value)| value.downcast_ref::<T>())
    }

    /// Checks if the entity carries a component of type `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.component::<T>().is_some()
    }

    fn insert(&mut self, key: ComponentKey, value: Box<dyn Any>) {
        if let Some(slot) = self.components.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.components.push((key, value));
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field(
                "components",
                &self.components.iter().map(|(k, _)| k.name()).collect::<Vec<_>>(),
            )
            .field("active_self", &self.active_self)
            .finish()
    }
}
