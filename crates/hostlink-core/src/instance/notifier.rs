//! One-shot "instance ready" notification.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::engine::EngineHandle;
use crate::events::listeners::panic_message;

/// Callback fired once the engine instance exists.
pub type InstanceCreatedCallback = Box<dyn FnOnce(&Arc<EngineHandle>) + Send + 'static>;

/// Pending one-shot listeners. Firing drains the list, so every callback
/// runs at most once.
#[derive(Default)]
pub struct OneShotNotifier {
    pending: Vec<InstanceCreatedCallback>,
}

impl OneShotNotifier {
    /// Create a notifier with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `callback` until the next [`take`](Self::take).
    pub fn push(&mut self, callback: InstanceCreatedCallback) {
        self.pending.push(callback);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every pending callback, leaving the notifier empty.
    pub fn take(&mut self) -> Vec<InstanceCreatedCallback> {
        std::mem::take(&mut self.pending)
    }

    /// Run `callbacks` against `instance`, isolating panics.
    pub fn fire(callbacks: Vec<InstanceCreatedCallback>, instance: &Arc<EngineHandle>) {
        for callback in callbacks {
            fire_one(callback, instance);
        }
    }
}

pub(crate) fn fire_one(callback: InstanceCreatedCallback, instance: &Arc<EngineHandle>) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(instance))) {
        error!(
            "Instance-created listener panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}
