//! # Entity Id Serialization
//!
//! Entity ids are not stable across sessions. Scenes are saved with dense
//! *serial* ids instead, and an [`EntitySerializationMap`] translates in both
//! directions for the duration of one save or load.
//!
//! Serial id `0` always stands for [`EntityId::NULL`].

use std::collections::HashMap;

use crate::ecs::EntityId;
use crate::error::{EcsError, EcsResult};

/// Key/value storage an asset layer writes scenes into.
pub trait DataBlock {
    /// Stores an unsigned value under `key`, replacing any previous value.
    fn set_u32(&mut self, key: &str, value: u32);

    /// Reads an unsigned value.
    fn get_u32(&self, key: &str) -> Option<u32>;
}

impl DataBlock for HashMap<String, u32> {
    fn set_u32(&mut self, key: &str, value: u32) {
        self.insert(key.to_owned(), value);
    }

    fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).copied()
    }
}

/// Bidirectional EntityId ↔ serial id table for one save or load.
#[derive(Debug, Default)]
pub struct EntitySerializationMap {
    serial_ids: HashMap<EntityId, u32>,
    entities: HashMap<u32, EntityId>,
    next_serial: u32,
}

impl EntitySerializationMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serial id of `id`, assigning the next dense one on first use.
    ///
    /// # Errors
    ///
    /// [`EcsError::SerialIdsExhausted`] if `id` is new and `u32::MAX` has
    /// already been assigned or bound.
    pub fn serial_id(&mut self, id: EntityId) -> EcsResult<u32> {
        if id.is_null() {
            return Ok(0);
        }
        if let Some(&serial) = self.serial_ids.get(&id) {
            return Ok(serial);
        }
        let serial = self
            .next_serial
            .checked_add(1)
            .ok_or(EcsError::SerialIdsExhausted)?;
        self.next_serial = serial;
        self.serial_ids.insert(id, serial);
        self.entities.insert(serial, id);
        Ok(serial)
    }

    /// Records that `serial` was loaded as `id`.
    ///
    /// Any earlier pairing of either `serial` or `id` is dropped, so the
    /// map stays one-to-one.
    pub fn bind(&mut self, serial: u32, id: EntityId) {
        if serial == 0 || id.is_null() {
            return;
        }
        if let Some(previous) = self.entities.insert(serial, id) {
            if previous != id {
                self.serial_ids.remove(&previous);
            }
        }
        if let Some(previous) = self.serial_ids.insert(id, serial) {
            if previous != serial {
                self.entities.remove(&previous);
            }
        }
        self.next_serial = self.next_serial.max(serial);
    }

    /// Entity bound to `serial`, or [`EntityId::NULL`].
    #[must_use]
    pub fn resolve(&self, serial: u32) -> EntityId {
        self.entities.get(&serial).copied().unwrap_or(EntityId::NULL)
    }

    /// Number of mapped entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Forgets every mapping.
    pub fn clear(&mut self) {
        self.serial_ids.clear();
        self.entities.clear();
        self.next_serial = 0;
    }
}

/// Writes `id` under `key` as a serial id.
///
/// # Errors
///
/// [`EcsError::SerialIdsExhausted`] if `id` needs a new serial id and none
/// is left. The block is not written in that case.
pub fn serialize_entity_id_to_data_block<B: DataBlock + ?Sized>(
    map: &mut EntitySerializationMap,
    id: EntityId,
    block: &mut B,
    key: &str,
) -> EcsResult<()> {
    block.set_u32(key, map.serial_id(id)?);
    Ok(())
}

/// Reads the serial id under `key` and resolves it.
///
/// # Returns
///
/// [`EntityId::NULL`] if the key is missing or the serial id is not bound.
#[must_use]
pub fn deserialize_entity_id_from_data_block<B: DataBlock + ?Sized>(
    map: &EntitySerializationMap,
    block: &B,
    key: &str,
) -> EntityId {
    block
        .get_u32(key)
        .map_or(EntityId::NULL, |serial| map.resolve(serial))
}

/// Views a slice of ids as raw bytes.
#[must_use]
pub fn entity_ids_to_bytes(ids: &[EntityId]) -> &[u8] {
    bytemuck::cast_slice(ids)
}

/// Reads ids from raw bytes of any alignment.
///
/// # Returns
///
/// `None` if the length is not a multiple of eight.
#[must_use]
pub fn entity_ids_from_bytes(bytes: &[u8]) -> Option<Vec<EntityId>> {
    let chunks = bytes.chunks_exact(std::mem::size_of::<EntityId>());
    if !chunks.remainder().is_empty() {
        return None;
    }
    Some(chunks.map(bytemuck::pod_read_unaligned::<EntityId>).collect())
}
