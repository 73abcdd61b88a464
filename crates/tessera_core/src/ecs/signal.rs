//! # World Listeners
//!
//! Callback lists whose registrations are owned by [`Subscription`] tokens.
//! Dropping the token unsubscribes; a dropped list makes the token inert.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

struct ListenerSlots<F: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Rc<F>)>,
}

/// An ordered list of listeners.
pub(crate) struct Listeners<F: ?Sized> {
    slots: Rc<RefCell<ListenerSlots<F>>>,
}

impl<F: ?Sized + 'static> Listeners<F> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Rc::new(RefCell::new(ListenerSlots {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub(crate) fn subscribe(&self, listener: Rc<F>) -> Subscription {
        let id = {
            let mut slots = self.slots.borrow_mut();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.entries.push((id, listener));
            id
        };
        let weak: Weak<RefCell<ListenerSlots<F>>> = Rc::downgrade(&self.slots);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(slots) = weak.upgrade() {
                    slots.borrow_mut().entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Listeners in subscription order. Subscribing or unsubscribing from a
    /// callback does not affect the returned list.
    pub(crate) fn snapshot(&self) -> Vec<Rc<F>> {
        self.slots
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.borrow().entries.len()
    }
}

/// RAII registration token. Dropping it removes the listener.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Keeps the listener registered for the lifetime of the world.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_drop_unsubscribes() {
        let listeners: Listeners<dyn Fn(u32)> = Listeners::new();
        let hits = Rc::new(Cell::new(0u32));

        let counter = Rc::clone(&hits);
        let sub = listeners.subscribe(Rc::new(move |n: u32| counter.set(counter.get() + n)));
        for listener in listeners.snapshot() {
            listener(2);
        }
        assert_eq!(hits.get(), 2);

        drop(sub);
        assert_eq!(listeners.len(), 0);
        assert!(listeners.snapshot().is_empty());
    }

    #[test]
    fn test_detach_keeps_listener() {
        let listeners: Listeners<dyn Fn(u32)> = Listeners::new();
        listeners.subscribe(Rc::new(|_: u32| {})).detach();
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_token_outlives_list() {
        let listeners: Listeners<dyn Fn(u32)> = Listeners::new();
        let sub = listeners.subscribe(Rc::new(|_: u32| {}));
        drop(listeners);
        drop(sub);
    }
}
