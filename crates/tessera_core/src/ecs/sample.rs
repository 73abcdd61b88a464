//! # Entities Samples
//!
//! A sample is a live, deduplicated set of entities matching an aspect. The
//! world forwards every entity mutation to every sample, so membership is
//! always in sync with the entity table when control returns to the caller.
//!
//! Samples are shared handles: requesting the same (kind, aspect, flags)
//! twice from one world returns the same instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ops::BitOr;
use std::rc::Rc;

use super::aspect::EntityAspect;
use super::entity::EntityId;
use super::mask::ComponentMask;

/// How a sample was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// Built from an explicit aspect.
    Common,
    /// Built from a static component tuple.
    GenericInclusive,
    /// Built from a single (usually dynamic) component id.
    DynamicId,
}

/// Sample matching options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SampleFlags(u8);

impl SampleFlags {
    /// No options: only active entities match.
    pub const NONE: Self = Self(0);
    /// Also match entities whose `active_self` is false.
    pub const INCLUDE_INACTIVE: Self = Self(1 << 0);

    /// Returns true if every flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SampleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Cache key of a sample within its world.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SampleKey {
    pub(crate) kind: SampleKind,
    pub(crate) aspect: EntityAspect,
    pub(crate) flags: SampleFlags,
}

#[derive(Debug)]
struct SampleState {
    key: SampleKey,
    world_tag: u16,
    members: Vec<EntityId>,
    positions: HashMap<EntityId, usize>,
}

/// Shared handle to a live entity set.
#[derive(Clone, Debug)]
pub struct EntitiesSample {
    state: Rc<RefCell<SampleState>>,
}

impl EntitiesSample {
    pub(crate) fn new(key: SampleKey, world_tag: u16) -> Self {
        Self {
            state: Rc::new(RefCell::new(SampleState {
                key,
                world_tag,
                members: Vec::new(),
                positions: HashMap::new(),
            })),
        }
    }

    /// How this sample was requested.
    #[must_use]
    pub fn kind(&self) -> SampleKind {
        self.state.borrow().key.kind
    }

    /// The aspect members satisfy.
    #[must_use]
    pub fn aspect(&self) -> EntityAspect {
        self.state.borrow().key.aspect.clone()
    }

    /// Matching options.
    #[must_use]
    pub fn flags(&self) -> SampleFlags {
        self.state.borrow().key.flags
    }

    /// Checks whether `id` is currently a member.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.state.borrow().positions.contains_key(&id)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().members.len()
    }

    /// Returns true if the sample has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().members.is_empty()
    }

    /// Snapshot of the current members.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.state.borrow().members.clone()
    }

    /// Returns true if both handles refer to the same sample.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn has_key(&self, key: &SampleKey) -> bool {
        self.state.borrow().key == *key
    }

    pub(crate) fn world_tag(&self) -> u16 {
        self.state.borrow().world_tag
    }

    pub(crate) fn strong_count(&self) -> usize {
        Rc::strong_count(&self.state)
    }

    /// Evaluates the membership predicate for an entity state.
    pub(crate) fn accepts(&self, mask: &ComponentMask, active: bool, removing: bool) -> bool {
        let state = self.state.borrow();
        !removing
            && (active || state.key.flags.contains(SampleFlags::INCLUDE_INACTIVE))
            && state.key.aspect.matches(mask)
    }

    /// Adds a member. Returns false if it was already present.
    pub(crate) fn insert(&self, id: EntityId) -> bool {
        let mut state = self.state.borrow_mut();
        if state.positions.contains_key(&id) {
            return false;
        }
        let position = state.members.len();
        state.members.push(id);
        state.positions.insert(id, position);
        true
    }

    /// Removes a member. Returns false if it was not present.
    pub(crate) fn remove(&self, id: EntityId) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(position) = state.positions.remove(&id) else {
            return false;
        };
        state.members.swap_remove(position);
        if let Some(&moved) = state.members.get(position) {
            state.positions.insert(moved, position);
        }
        true
    }
}
