//! # Component System Event Handlers
//!
//! A handler binds a callback to one event type and, optionally, to a sample.
//! Handlers for the same event type form an ordered list: registration order,
//! rearranged to satisfy `before`/`after` constraints between system names.

use std::any::{Any, TypeId};
use std::cell::Cell;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::fmt;
use std::rc::Rc;

use super::entity::EntityId;
use super::sample::{EntitiesSample, SampleFlags};
use super::world::EcsWorld;

/// Type-erased handler callback.
pub(crate) type HandlerFn = dyn Fn(&mut EcsWorld, Option<EntityId>, &mut dyn Any);

/// Ordering constraints against other systems, by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemOrder {
    /// Systems this one must run before.
    pub before: BTreeSet<String>,
    /// Systems this one must run after.
    pub after: BTreeSet<String>,
}

impl SystemOrder {
    /// Returns true if no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// Registration options for a handler.
#[derive(Clone, Debug, Default)]
pub struct HandlerOptions {
    /// Tags the world must carry for the handler to attach.
    pub tags: BTreeSet<String>,
    /// Ordering constraints.
    pub order: SystemOrder,
    /// Flags for the sample requested on the handler's behalf.
    pub sample_flags: SampleFlags,
}

impl HandlerOptions {
    /// Options with no tags, no constraints and default sample flags.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires a world tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Runs before the system named `system`.
    #[must_use]
    pub fn before(mut self, system: impl Into<String>) -> Self {
        self.order.before.insert(system.into());
        self
    }

    /// Runs after the system named `system`.
    #[must_use]
    pub fn after(mut self, system: impl Into<String>) -> Self {
        self.order.after.insert(system.into());
        self
    }

    /// Sets the flags of the requested sample.
    #[must_use]
    pub fn with_sample_flags(mut self, flags: SampleFlags) -> Self {
        self.sample_flags = flags;
        self
    }
}

/// A registered handler.
pub struct ComponentSystemEventHandler {
    name: String,
    event_type: TypeId,
    event_name: &'static str,
    sample: Option<EntitiesSample>,
    tags: BTreeSet<String>,
    order: SystemOrder,
    seq: u64,
    attached: Cell<bool>,
    callback: Rc<HandlerFn>,
}

impl ComponentSystemEventHandler {
    pub(crate) fn new(
        name: String,
        event_type: TypeId,
        event_name: &'static str,
        sample: Option<EntitiesSample>,
        options: HandlerOptions,
        seq: u64,
        callback: Rc<HandlerFn>,
    ) -> Self {
        Self {
            name,
            event_type,
            event_name,
            sample,
            tags: options.tags,
            order: options.order,
            seq,
            attached: Cell::new(true),
            callback,
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

    /// The bound sample, `None` for global handlers.
    #[inline]
    #[must_use]
    pub fn sample(&self) -> Option<&EntitiesSample> {
        self.sample.as_ref()
    }

    /// Tags required from the world.
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Ordering constraints.
    #[inline]
    #[must_use]
    pub fn order(&self) -> &SystemOrder {
        &self.order
    }

    /// False once the handler was removed or its world began teardown.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub(crate) fn event_type(&self) -> TypeId {
        self.event_type
    }

    pub(crate) fn detach(&self) {
        self.attached.set(false);
    }

    pub(crate) fn invoke(&self, world: &mut EcsWorld, entity: Option<EntityId>, event: &mut dyn Any) {
        (self.callback)(world, entity, event);
    }
}

impl fmt::Debug for ComponentSystemEventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSystemEventHandler")
            .field("name", &self.name)
            .field("event", &self.event_name)
            .field("global", &self.sample.is_none())
            .field("seq", &self.seq)
            .field("attached", &self.attached.get())
            .finish_non_exhaustive()
    }
}

/// Handle returned by handler registration.
#[derive(Clone, Debug)]
pub struct SystemHandle {
    handler: Rc<ComponentSystemEventHandler>,
}

impl SystemHandle {
    pub(crate) fn new(handler: Rc<ComponentSystemEventHandler>) -> Self {
        Self { handler }
    }

    /// System name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.handler.name()
    }

    /// Whether the handler is still registered.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.handler.is_attached()
    }

    /// The underlying handler.
    #[must_use]
    pub fn handler(&self) -> &ComponentSystemEventHandler {
        &self.handler
    }

    pub(crate) fn rc(&self) -> &Rc<ComponentSystemEventHandler> {
        &self.handler
    }
}

/// Sorted handler list of one event type.
#[derive(Default)]
pub(crate) struct HandlerList {
    handlers: Vec<Rc<ComponentSystemEventHandler>>,
}

impl HandlerList {
    /// Handlers in dispatch order.
    pub(crate) fn handlers(&self) -> &[Rc<ComponentSystemEventHandler>] {
        &self.handlers
    }

    /// Inserts a handler, keeping the list sorted.
    ///
    /// # Returns
    ///
    /// `false` (and the list unchanged) if the constraints become cyclic.
    pub(crate) fn insert(&mut self, handler: Rc<ComponentSystemEventHandler>) -> bool {
        let mut candidate = self.handlers.clone();
        candidate.push(handler);
        match sort_handlers(candidate) {
            Some(sorted) => {
                self.handlers = sorted;
                true
            }
            None => false,
        }
    }

    /// Removes a handler by identity.
    pub(crate) fn remove(&mut self, handler: &Rc<ComponentSystemEventHandler>) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|h| !Rc::ptr_eq(h, handler));
        if self.handlers.len() == before {
            return false;
        }
        // A subset of an acyclic graph stays acyclic.
        let remaining = std::mem::take(&mut self.handlers);
        self.handlers = sort_handlers(remaining.clone()).unwrap_or(remaining);
        true
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, Rc<ComponentSystemEventHandler>> {
        self.handlers.drain(..)
    }
}

/// Topologically sorts handlers with Kahn's algorithm.
///
/// Edges come from `before`/`after` names; unknown names are ignored. Among
/// handlers that are ready at the same time, the earliest registration wins.
///
/// # Returns
///
/// `None` if the constraints contain a cycle.
fn sort_handlers(
    handlers: Vec<Rc<ComponentSystemEventHandler>>,
) -> Option<Vec<Rc<ComponentSystemEventHandler>>> {
    let count = handlers.len();

    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, handler) in handlers.iter().enumerate() {
        by_name.entry(handler.name()).or_default().push(index);
    }

    // Build adjacency list: A -> B if A must run before B
    let mut in_degree = vec![0usize; count];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (index, handler) in handlers.iter().enumerate() {
        for name in &handler.order.before {
            for &target in by_name.get(name.as_str()).into_iter().flatten() {
                if target != index {
                    adjacency[index].push(target);
                    in_degree[target] += 1;
                }
            }
        }
        for name in &handler.order.after {
            for &source in by_name.get(name.as_str()).into_iter().flatten() {
                if source != index {
                    adjacency[source].push(index);
                    in_degree[index] += 1;
                }
            }
        }
    }

    // Kahn's algorithm, ready set ordered by registration sequence
    let mut ready: BinaryHeap<Reverse<(u64, usize)>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(index, _)| Reverse((handlers[index].seq, index)))
        .collect();

    let mut order = Vec::with_capacity(count);
    while let Some(Reverse((_, index))) = ready.pop() {
        order.push(index);
        for &next in &adjacency[index] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse((handlers[next].seq, next)));
            }
        }
    }

    if order.len() != count {
        return None;
    }

    let mut slots: Vec<Option<Rc<ComponentSystemEventHandler>>> =
        handlers.into_iter().map(Some).collect();
    Some(order.into_iter().filter_map(|index| slots[index].take()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(name: &str, seq: u64, options: HandlerOptions) -> Rc<ComponentSystemEventHandler> {
        Rc::new(ComponentSystemEventHandler::new(
            name.to_owned(),
            TypeId::of::<()>(),
            "()",
            None,
            options,
            seq,
            Rc::new(|_: &mut EcsWorld, _: Option<EntityId>, _: &mut dyn Any| {}),
        ))
    }

    fn names(list: &HandlerList) -> Vec<&str> {
        list.handlers().iter().map(|h| h.name()).collect()
    }

    #[test]
    fn test_registration_order_without_constraints() {
        let mut list = HandlerList::default();
        assert!(list.insert(handler("a", 0, HandlerOptions::new())));
        assert!(list.insert(handler("b", 1, HandlerOptions::new())));
        assert!(list.insert(handler("c", 2, HandlerOptions::new())));
        assert_eq!(names(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_before_and_after_constraints() {
        let mut list = HandlerList::default();
        assert!(list.insert(handler("physics", 0, HandlerOptions::new())));
        assert!(list.insert(handler("input", 1, HandlerOptions::new().before("physics"))));
        assert!(list.insert(handler("render", 2, HandlerOptions::new())));
        assert!(list.insert(handler("audio", 3, HandlerOptions::new().after("input").before("render"))));
        assert_eq!(names(&list), vec!["input", "physics", "audio", "render"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut list = HandlerList::default();
        assert!(list.insert(handler("a", 0, HandlerOptions::new().before("b"))));
        assert!(list.insert(handler("b", 1, HandlerOptions::new())));
        assert!(!list.insert(handler("c", 2, HandlerOptions::new().after("b").before("a"))));
        assert_eq!(names(&list), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_by_identity() {
        let mut list = HandlerList::default();
        let a = handler("a", 0, HandlerOptions::new());
        assert!(list.insert(Rc::clone(&a)));
        assert!(list.insert(handler("b", 1, HandlerOptions::new())));
        assert!(list.remove(&a));
        assert!(!list.remove(&a));
        assert_eq!(names(&list), vec!["b"]);
    }
}
