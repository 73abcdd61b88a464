//! # Entity Aspects
//!
//! An aspect is the predicate a sample applies to an entity's component
//! composition: "has all of {A, B}", "has any of {A, B}", optionally
//! combined with "has none of {C}".
//!
//! Aspects keep their ids as sorted lists, so an aspect naming an id the
//! registry never issued costs one entry and simply never matches it.

use super::component::ComponentId;
use super::mask::ComponentMask;

fn sorted_ids<I: IntoIterator<Item = ComponentId>>(ids: I) -> Vec<ComponentId> {
    let mut ids: Vec<ComponentId> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// How the required component list is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AspectKind {
    /// Every listed component must be present.
    HaveAllOf,
    /// At least one listed component must be present.
    HaveAnyOf,
}

/// Component predicate used as a sample key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityAspect {
    kind: AspectKind,
    components: Vec<ComponentId>,
    excluded: Vec<ComponentId>,
}

impl EntityAspect {
    /// Matches entities owning every component in `ids`.
    ///
    /// An empty list matches every entity.
    #[must_use]
    pub fn all_of<I: IntoIterator<Item = ComponentId>>(ids: I) -> Self {
        Self {
            kind: AspectKind::HaveAllOf,
            components: sorted_ids(ids),
            excluded: Vec::new(),
        }
    }

    /// Matches entities owning at least one component in `ids`.
    ///
    /// An empty list matches nothing.
    #[must_use]
    pub fn any_of<I: IntoIterator<Item = ComponentId>>(ids: I) -> Self {
        Self {
            kind: AspectKind::HaveAnyOf,
            components: sorted_ids(ids),
            excluded: Vec::new(),
        }
    }

    /// Additionally rejects entities owning any component in `ids`.
    #[must_use]
    pub fn with_none_of<I: IntoIterator<Item = ComponentId>>(mut self, ids: I) -> Self {
        let mut excluded = std::mem::take(&mut self.excluded);
        excluded.extend(ids);
        self.excluded = sorted_ids(excluded);
        self
    }

    /// The aspect kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> AspectKind {
        self.kind
    }

    /// Required (or candidate) components, ascending.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Excluded components, ascending.
    #[inline]
    #[must_use]
    pub fn excluded(&self) -> &[ComponentId] {
        &self.excluded
    }

    /// Evaluates the aspect against an entity's component mask.
    #[must_use]
    pub fn matches(&self, mask: &ComponentMask) -> bool {
        if self.excluded.iter().any(|&id| mask.contains(id)) {
            return false;
        }
        match self.kind {
            AspectKind::HaveAllOf => self.components.iter().all(|&id| mask.contains(id)),
            AspectKind::HaveAnyOf => self.components.iter().any(|&id| mask.contains(id)),
        }
    }
}
