//! # World Tags
//!
//! Every live world owns a distinct 16-bit tag that is stamped into the
//! entity ids it mints. Tag 0 is never assigned and `u16::MAX` is reserved
//! for [`EntityId::NULL`](super::EntityId::NULL).
//!
//! Tags are handed out round-robin and skip any tag still held by a live
//! world, so a freed tag is reused as late as possible.

use parking_lot::Mutex;

const TAG_WORDS: usize = (u16::MAX as usize + 1) / 64;

/// Process-wide pool shared by every world.
static WORLD_TAGS: Mutex<WorldTagAllocator> = parking_lot::const_mutex(WorldTagAllocator::new());

/// Claims a tag for a new world. `None` when every usable tag is live.
pub(crate) fn acquire_world_tag() -> Option<u16> {
    WORLD_TAGS.lock().acquire()
}

/// Returns a dropped world's tag to the pool.
pub(crate) fn release_world_tag(tag: u16) {
    WORLD_TAGS.lock().release(tag);
}

/// Bitset of live tags plus a round-robin cursor.
pub(crate) struct WorldTagAllocator {
    live: [u64; TAG_WORDS],
    cursor: u16,
}

impl WorldTagAllocator {
    /// Number of assignable tags.
    pub(crate) const CAPACITY: usize = u16::MAX as usize - 1;

    pub(crate) const fn new() -> Self {
        Self {
            live: [0; TAG_WORDS],
            cursor: 1,
        }
    }

    #[inline]
    fn is_live(&self, tag: u16) -> bool {
        self.live[tag as usize / 64] & (1 << (tag % 64)) != 0
    }

    pub(crate) fn acquire(&mut self) -> Option<u16> {
        for _ in 0..Self::CAPACITY {
            let tag = self.cursor;
            self.cursor = if tag >= u16::MAX - 1 { 1 } else { tag + 1 };
            if !self.is_live(tag) {
                self.live[tag as usize / 64] |= 1 << (tag % 64);
                return Some(tag);
            }
        }
        None
    }

    pub(crate) fn release(&mut self, tag: u16) {
        if tag == 0 || tag == u16::MAX {
            return;
        }
        self.live[tag as usize / 64] &= !(1 << (tag % 64));
    }
}
