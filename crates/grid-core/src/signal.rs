//! Single-threaded multicast notification.
//!
//! Listeners are called synchronously in registration order. `notify` walks a
//! snapshot of the registry, so a listener may subscribe or unsubscribe
//! (itself or others) from inside a callback: listeners removed mid-cycle are
//! skipped, listeners added mid-cycle wait for the next notification.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Opaque handle returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener<A> = Rc<dyn Fn(&A)>;

pub struct Signal<A: ?Sized> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(SubscriptionId, Listener<A>)>>,
}

impl<A: ?Sized> Default for Signal<A> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }
}

impl<A: ?Sized> Signal<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<L>(&self, listener: L) -> SubscriptionId
    where
        L: Fn(&A) + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Returns false if `id` was not (or no longer) subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|(existing, _)| *existing == id) {
            Some(position) => {
                listeners.remove(position);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|(existing, _)| *existing == id)
    }

    /// Call every listener with `args`, including when `args` is empty.
    pub fn notify(&self, args: &A) {
        let snapshot: Vec<(SubscriptionId, Listener<A>)> = self.listeners.borrow().clone();
        for (id, listener) in snapshot {
            if self.is_subscribed(id) {
                listener(args);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listener_count() == 0
    }
}

impl<A: ?Sized> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
