//! # Component Masks
//!
//! A growable bitset over [`ComponentId`]s. Trailing zero words are always
//! trimmed, so two masks with the same bits compare and hash equal no matter
//! how large they grew in between.

use super::component::ComponentId;

const WORD_BITS: usize = 64;

/// Set of component ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ComponentMask {
    words: Vec<u64>,
}

impl ComponentMask {
    /// Creates an empty mask.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Builds a mask from a list of ids.
    #[must_use]
    pub fn from_ids<I: IntoIterator<Item = ComponentId>>(ids: I) -> Self {
        let mut mask = Self::new();
        for id in ids {
            mask.insert(id);
        }
        mask
    }

    /// Sets the bit for `id`. Storage grows to the word holding `id`.
    pub fn insert(&mut self, id: ComponentId) {
        let (word, bit) = Self::split(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= bit;
    }

    /// Clears the bit for `id`.
    pub fn remove(&mut self, id: ComponentId) {
        let (word, bit) = Self::split(id);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !bit;
        }
        self.trim();
    }

    /// Checks whether `id` is set.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        let (word, bit) = Self::split(id);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    /// True if every bit of `other` is set in `self`.
    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        other.words.iter().enumerate().all(|(i, &w)| {
            let mine = self.words.get(i).copied().unwrap_or(0);
            mine & w == w
        })
    }

    /// True if `self` and `other` share at least one bit.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Returns true if no bit is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of set bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates over set ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS).filter_map(move |bit| {
                #[allow(clippy::cast_possible_truncation)]
                let id = ComponentId((i * WORD_BITS + bit) as u32);
                (word & (1u64 << bit) != 0).then_some(id)
            })
        })
    }

    #[inline]
    fn split(id: ComponentId) -> (usize, u64) {
        let index = id.index();
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl FromIterator<ComponentId> for ComponentMask {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}
