//! FIFO event channel with adjacent-duplicate suppression.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// An event that can be queued on a [`QueuedDispatcher`].
pub trait QueuedEvent: Send {
    /// Whether `self` repeats `previous` closely enough to be dropped when
    /// it directly follows it in the queue.
    fn is_duplicate_of(&self, previous: &Self) -> bool;
}

/// Ordered event queue.
///
/// An event is dropped only when it duplicates the entry currently at the
/// tail, so `A, A` queues once while `A, B, A` queues three times.
pub struct QueuedDispatcher<E> {
    queue: Mutex<VecDeque<E>>,
    /// Serializes draining so concurrent dispatches deliver each event once,
    /// in order. Producers never wait on it.
    drain: Mutex<()>,
}

impl<E: QueuedEvent> QueuedDispatcher<E> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            drain: Mutex::new(()),
        }
    }

    /// Append `event` unless it duplicates the tail. Returns whether it was
    /// appended.
    pub fn enqueue(&self, event: E) -> bool {
        let mut queue = self.queue.lock();
        if queue.back().is_some_and(|last| event.is_duplicate_of(last)) {
            return false;
        }
        queue.push_back(event);
        true
    }

    /// Pop events oldest first and hand each to `deliver` until the queue is
    /// empty, including events enqueued while delivering. Returns the number
    /// delivered.
    pub fn dispatch<F>(&self, mut deliver: F) -> usize
    where
        F: FnMut(&E),
    {
        let _drain = self.drain.lock();
        let mut delivered = 0;
        loop {
            let Some(event) = self.queue.lock().pop_front() else {
                break;
            };
            deliver(&event);
            delivered += 1;
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<E: QueuedEvent> Default for QueuedDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Key(&'static str);

    impl QueuedEvent for Key {
        fn is_duplicate_of(&self, previous: &Self) -> bool {
            self == previous
        }
    }

    struct Ping;

    impl QueuedEvent for Ping {
        fn is_duplicate_of(&self, _previous: &Self) -> bool {
            false
        }
    }

    #[test]
    fn test_adjacent_duplicate_is_dropped() {
        let dispatcher = QueuedDispatcher::new();
        assert!(dispatcher.enqueue(Key("a")));
        assert!(!dispatcher.enqueue(Key("a")));
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn test_non_adjacent_repeat_is_kept() {
        let dispatcher = QueuedDispatcher::new();
        dispatcher.enqueue(Key("a"));
        dispatcher.enqueue(Key("b"));
        dispatcher.enqueue(Key("a"));

        let mut seen = Vec::new();
        assert_eq!(dispatcher.dispatch(|e| seen.push(e.0)), 3);
        assert_eq!(seen, vec!["a", "b", "a"]);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_always_distinct_events_all_queue() {
        let dispatcher = QueuedDispatcher::new();
        assert!(dispatcher.enqueue(Ping));
        assert!(dispatcher.enqueue(Ping));
        assert_eq!(dispatcher.dispatch(|_| {}), 2);
        assert_eq!(dispatcher.dispatch(|_| {}), 0);
    }

    #[test]
    fn test_dedup_resets_after_drain() {
        let dispatcher = QueuedDispatcher::new();
        dispatcher.enqueue(Key("a"));
        dispatcher.dispatch(|_| {});
        assert!(dispatcher.enqueue(Key("a")));
    }
}
