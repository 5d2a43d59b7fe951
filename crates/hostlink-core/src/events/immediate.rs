//! Latest-value event channel.

use parking_lot::Mutex;

struct Slot<T> {
    /// Last recorded value. Kept after dispatch for change detection.
    value: Option<T>,
    has_value: bool,
    is_dispatched: bool,
}

/// Coalescing channel that delivers the latest value at most once per
/// detected change.
pub struct ImmediateDispatcher<T> {
    slot: Mutex<Slot<T>>,
    drain: Mutex<()>,
}

impl<T: Clone + PartialEq> ImmediateDispatcher<T> {
    /// Create a channel with nothing recorded.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                has_value: false,
                is_dispatched: false,
            }),
            drain: Mutex::new(()),
        }
    }

    /// Store `value` if it differs from the last recorded one, or if nothing
    /// was recorded yet. Returns whether it was stored.
    pub fn record(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if slot.value.as_ref() == Some(&value) {
            return false;
        }
        slot.value = Some(value);
        slot.has_value = true;
        slot.is_dispatched = false;
        true
    }

    /// Deliver the pending value, if any. Returns whether `deliver` ran.
    pub fn dispatch<F>(&self, deliver: F) -> bool
    where
        F: FnOnce(&T),
    {
        let _drain = self.drain.lock();
        let pending = {
            let mut slot = self.slot.lock();
            if !slot.has_value || slot.is_dispatched {
                return false;
            }
            slot.is_dispatched = true;
            slot.has_value = false;
            slot.value.clone()
        };
        match pending {
            Some(value) => {
                deliver(&value);
                true
            }
            None => false,
        }
    }

    /// Whether a recorded value is waiting to be dispatched.
    pub fn is_pending(&self) -> bool {
        let slot = self.slot.lock();
        slot.has_value && !slot.is_dispatched
    }

    /// Last recorded value, dispatched or not.
    pub fn current(&self) -> Option<T> {
        self.slot.lock().value.clone()
    }
}

impl<T: Clone + PartialEq> Default for ImmediateDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_twice_delivers_once() {
        let dispatcher = ImmediateDispatcher::new();
        assert!(dispatcher.record((1, 2)));
        let mut count = 0;
        assert!(dispatcher.dispatch(|_| count += 1));
        assert!(!dispatcher.dispatch(|_| count += 1));
        assert_eq!(count, 1);
    }

    #[test]
    fn test_unchanged_value_after_dispatch_is_ignored() {
        let dispatcher = ImmediateDispatcher::new();
        dispatcher.record(true);
        dispatcher.dispatch(|_| {});
        assert!(!dispatcher.record(true));
        assert!(!dispatcher.is_pending());
        assert!(!dispatcher.dispatch(|_| panic!("must not redeliver")));
    }

    #[test]
    fn test_single_field_change_delivers_full_value() {
        let dispatcher = ImmediateDispatcher::new();
        dispatcher.record((0.5f32, 0.0f32));
        dispatcher.dispatch(|_| {});

        assert!(dispatcher.record((0.5f32, 0.25f32)));
        let mut delivered = None;
        dispatcher.dispatch(|v| delivered = Some(*v));
        assert_eq!(delivered, Some((0.5, 0.25)));
    }

    #[test]
    fn test_coalesces_to_latest() {
        let dispatcher = ImmediateDispatcher::new();
        dispatcher.record(1);
        dispatcher.record(2);
        dispatcher.record(3);
        let mut seen = Vec::new();
        dispatcher.dispatch(|v| seen.push(*v));
        assert_eq!(seen, vec![3]);
        assert_eq!(dispatcher.current(), Some(3));
    }

    #[test]
    fn test_nothing_recorded_nothing_dispatched() {
        let dispatcher: ImmediateDispatcher<u8> = ImmediateDispatcher::new();
        assert!(!dispatcher.dispatch(|_| {}));
        assert_eq!(dispatcher.current(), None);
    }
}
