//! # Entity Table
//!
//! Dense storage of live entities plus the id allocator.
//!
//! ```text
//! slots (by id index)          dense (swap-erase)
//! ┌───┬─────────────┐          ┌──────────────────┐
//! │ 0 │ gen 3 → [1] │ ───────▶ │ [0] id 2v0, rec  │
//! │ 1 │ gen 1 free  │    ┌───▶ │ [1] id 0v3, rec  │
//! │ 2 │ gen 0 → [0] │ ───┘     └──────────────────┘
//! │ 3 │ gen 0 pend. │
//! └───┴─────────────┘
//! ```
//!
//! Freed indices go on a LIFO stack; each release bumps the slot generation
//! so ids held across a removal never resolve again.

use std::any::Any;
use std::collections::BTreeMap;

use super::component::ComponentId;
use super::entity::EntityId;
use super::mask::ComponentMask;

/// In-world state of one entity.
pub(crate) struct EntityRecord {
    pub(crate) components: BTreeMap<ComponentId, Box<dyn Any>>,
    pub(crate) mask: ComponentMask,
    pub(crate) active_self: bool,
    pub(crate) removing: bool,
}

impl EntityRecord {
    pub(crate) fn new(active_self: bool) -> Self {
        Self {
            components: BTreeMap::new(),
            mask: ComponentMask::new(),
            active_self,
            removing: false,
        }
    }

    pub(crate) fn insert(&mut self, id: ComponentId, value: Box<dyn Any>) {
        self.components.insert(id, value);
        self.mask.insert(id);
    }

    pub(crate) fn remove(&mut self, id: ComponentId) -> Option<Box<dyn Any>> {
        let value = self.components.remove(&id)?;
        self.mask.remove(id);
        Some(value)
    }
}

struct EntityData {
    id: EntityId,
    record: EntityRecord,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotLocation {
    Free,
    /// Generation space exhausted. The index is never handed out again.
    Retired,
    Pending,
    Dense(u32),
}

#[derive(Clone, Copy, Debug)]
struct SlotEntry {
    generation: u16,
    location: SlotLocation,
}

/// Dense entity storage with generation-checked lookup.
pub(crate) struct EntityTable {
    world_tag: u16,
    dense: Vec<EntityData>,
    slots: Vec<SlotEntry>,
    free_indices: Vec<u32>,
}

impl EntityTable {
    pub(crate) fn new(world_tag: u16) -> Self {
        Self {
            world_tag,
            dense: Vec::new(),
            slots: Vec::new(),
            free_indices: Vec::new(),
        }
    }

    /// Allocates an id and marks its slot pending.
    ///
    /// Pops the free stack if possible, otherwise appends a new slot.
    pub(crate) fn generate_new_entity_id(&mut self) -> EntityId {
        let index = if let Some(index) = self.free_indices.pop() {
            index
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let index = self.slots.len() as u32;
            self.slots.push(SlotEntry {
                generation: 0,
                location: SlotLocation::Free,
            });
            index
        };

        let slot = &mut self.slots[index as usize];
        slot.location = SlotLocation::Pending;
        EntityId::new(index, slot.generation, self.world_tag)
    }

    /// Pre-creates `count` free slots. The lowest new index is handed out first.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn reserve_entity_indices(&mut self, count: usize) {
        let start = self.slots.len();
        self.slots.reserve(count);
        self.dense.reserve(count);
        for _ in 0..count {
            self.slots.push(SlotEntry {
                generation: 0,
                location: SlotLocation::Free,
            });
        }
        self.free_indices
            .extend((start..start + count).rev().map(|index| index as u32));
    }

    fn slot(&self, id: EntityId) -> Option<&SlotEntry> {
        if id.is_null() || id.world_tag() != self.world_tag {
            return None;
        }
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
    }

    fn dense_index(&self, id: EntityId) -> Option<usize> {
        match self.slot(id)?.location {
            SlotLocation::Dense(index) => Some(index as usize),
            SlotLocation::Free | SlotLocation::Retired | SlotLocation::Pending => None,
        }
    }

    /// True if the id was allocated but its entity is not in the table yet.
    pub(crate) fn is_pending(&self, id: EntityId) -> bool {
        self.slot(id)
            .is_some_and(|slot| slot.location == SlotLocation::Pending)
    }

    /// True if the id resolves to a live entity.
    pub(crate) fn contains(&self, id: EntityId) -> bool {
        self.dense_index(id).is_some()
    }

    /// Moves a pending entity into the table.
    pub(crate) fn insert(&mut self, id: EntityId, record: EntityRecord) -> bool {
        if !self.is_pending(id) {
            return false;
        }
        #[allow(clippy::cast_possible_truncation)]
        let dense = self.dense.len() as u32;
        self.dense.push(EntityData { id, record });
        self.slots[id.index() as usize].location = SlotLocation::Dense(dense);
        true
    }

    /// Swap-erases a live entity and releases its id.
    pub(crate) fn remove(&mut self, id: EntityId) -> Option<EntityRecord> {
        let index = self.dense_index(id)?;
        let data = self.dense.swap_remove(index);
        if let Some(moved) = self.dense.get(index) {
            #[allow(clippy::cast_possible_truncation)]
            let location = SlotLocation::Dense(index as u32);
            self.slots[moved.id.index() as usize].location = location;
        }
        self.release(id);
        Some(data.record)
    }

    /// Returns a pending or live id's index to the free stack.
    ///
    /// A slot whose generation is already `u16::MAX` is retired instead,
    /// so a stale id can never resolve to a later occupant.
    pub(crate) fn release(&mut self, id: EntityId) {
        let Some(slot) = self.slot(id).copied() else {
            return;
        };
        if matches!(slot.location, SlotLocation::Free | SlotLocation::Retired) {
            return;
        }
        let entry = &mut self.slots[id.index() as usize];
        match entry.generation.checked_add(1) {
            Some(generation) => {
                entry.generation = generation;
                entry.location = SlotLocation::Free;
                self.free_indices.push(id.index());
            }
            None => entry.location = SlotLocation::Retired,
        }
    }

    pub(crate) fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        let index = self.dense_index(id)?;
        Some(&self.dense[index].record)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        let index = self.dense_index(id)?;
        Some(&mut self.dense[index].record)
    }

    /// Ids of every live entity, in dense order.
    pub(crate) fn ids(&self) -> Vec<EntityId> {
        self.dense.iter().map(|data| data.id).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.dense.len()
    }

    #[cfg(test)]
    fn free_count(&self) -> usize {
        self.free_indices.len()
    }

    #[cfg(test)]
    fn retired_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.location == SlotLocation::Retired)
            .count()
    }
}
