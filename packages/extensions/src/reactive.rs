//! # Reactive Events
//!
//! Synchronous publish/subscribe used for value-change and state-change
//! notifications.
//!
//! ## Guarantees
//!
//! - Listeners run on the thread that called [`EventBus::emit`], before
//!   `emit` returns
//! - Listeners run in registration order
//! - Every [`EventBus::subscribe`] returns a [`Subscription`]; calling
//!   [`Subscription::unsubscribe`] (or dropping it) detaches the listener
//!
//! A listener may subscribe or unsubscribe others while an event is being
//! delivered. Changes take effect from the next `emit`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Listener<E> = Rc<RefCell<dyn FnMut(&E)>>;

struct Registry<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

/// Single-threaded event bus
pub struct EventBus<E> {
    registry: Rc<RefCell<Registry<E>>>,
}

impl<E: 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener; it stays attached until the returned handle is
    /// unsubscribed or dropped.
    pub fn subscribe(&self, listener: impl FnMut(&E) + 'static) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            let listener: Listener<E> = Rc::new(RefCell::new(listener));
            registry.listeners.push((id, listener));
            id
        };

        let registry: Weak<RefCell<Registry<E>>> = Rc::downgrade(&self.registry);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry
                        .borrow_mut()
                        .listeners
                        .retain(|(listener_id, _)| *listener_id != id);
                }
            })),
        }
    }

    /// Deliver an event to every listener attached at the time of the call
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            // A listener that re-enters itself through a nested emit is skipped.
            if let Ok(mut callback) = listener.try_borrow_mut() {
                (&mut *callback)(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

impl<E: 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Rc::clone(&self.registry),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.registry.borrow().listeners.len())
            .finish()
    }
}

/// Handle to an attached listener
#[must_use = "dropping a Subscription detaches its listener"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Detach the listener
    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}
