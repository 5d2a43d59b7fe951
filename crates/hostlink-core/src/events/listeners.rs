//! Persistent multicast listener registry.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;

/// Set of persistent listeners, compared by identity.
///
/// Delivery iterates over a snapshot, so listeners may register or
/// unregister (themselves or others) from inside a callback. A panicking
/// listener is logged and skipped; the remaining listeners still receive the
/// event.
pub struct ListenerSet<L: ?Sized> {
    listeners: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> ListenerSet<L> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Add `listener`. Returns false if it was already registered.
    pub fn register(&self, listener: Arc<L>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Remove `listener`. Returns false if it was not registered.
    pub fn unregister(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    /// Whether `listener` is registered.
    pub fn contains(&self, listener: &Arc<L>) -> bool {
        self.listeners.read().iter().any(|l| same_listener(l, listener))
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Invoke `deliver` for every registered listener, isolating panics.
    ///
    /// Returns the number of listeners that completed without panicking.
    pub fn notify<F>(&self, event: &str, deliver: F) -> usize
    where
        F: Fn(&L),
    {
        let snapshot: Vec<Arc<L>> = self.listeners.read().clone();
        let mut delivered = 0;
        for listener in &snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| deliver(listener))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    error!(
                        "Listener panicked while handling {}: {}",
                        event,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        delivered
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity comparison that ignores trait-object metadata.
fn same_listener<L: ?Sized>(a: &Arc<L>, b: &Arc<L>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
