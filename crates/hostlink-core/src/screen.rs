//! Screen power handling.
//!
//! Some hosts keep reporting a background surface as visible while the
//! display is off. [`ScreenStateMonitor`] converts screen off/on events into
//! visibility changes for the active consumer so the engine pauses with the
//! display.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::instance::EngineInstanceManager;
use crate::session::SessionHandle;

/// A consumer that can replay a visibility change through its own
/// lifecycle path.
pub trait VisibilityConsumer: Send + Sync {
    fn session_handle(&self) -> Option<Arc<SessionHandle>>;

    fn on_visibility_changed(&self, visible: bool) -> bool;
}

pub struct ScreenStateMonitor {
    manager: Arc<EngineInstanceManager>,
    enabled: AtomicBool,
    visible_before_screen_off: Mutex<bool>,
    active_consumer: Mutex<Option<Weak<dyn VisibilityConsumer>>>,
}

impl ScreenStateMonitor {
    /// Create an enabled monitor for `manager`'s handles.
    pub fn new(manager: Arc<EngineInstanceManager>) -> Self {
        Self {
            manager,
            enabled: AtomicBool::new(true),
            visible_before_screen_off: Mutex::new(false),
            active_consumer: Mutex::new(None),
        }
    }

    /// Enable or disable screen off/on handling.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether screen off/on events are acted on.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Route replayed visibility through `consumer` instead of poking the
    /// active handle directly.
    pub fn set_active_consumer(&self, consumer: Weak<dyn VisibilityConsumer>) {
        *self.active_consumer.lock() = Some(consumer);
    }

    /// Forget the active consumer if it owns `handle`.
    pub fn clear_active_consumer_if(&self, handle: &SessionHandle) -> bool {
        let mut active = self.active_consumer.lock();
        let owns_handle = active
            .as_ref()
            .and_then(Weak::upgrade)
            .and_then(|consumer| consumer.session_handle())
            .is_some_and(|h| *h == *handle);
        if owns_handle {
            *active = None;
        }
        owns_handle
    }

    /// The display turned off. Returns whether the active consumer was made
    /// invisible.
    pub fn on_screen_off(&self) -> bool {
        let coordinator = self.manager.coordinator();
        if !self.is_enabled() || coordinator.registered_count() == 0 {
            return false;
        }

        {
            let mut visible_before = self.visible_before_screen_off.lock();
            *visible_before = coordinator.visible_count() > 0;
            if !*visible_before {
                trace!("Screen off with nothing visible");
                return false;
            }
        }

        debug!("Screen off, hiding active consumer");
        self.replay(false)
    }

    /// The display turned on. Returns whether the active consumer was made
    /// visible again.
    pub fn on_screen_on(&self) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let was_visible = std::mem::take(&mut *self.visible_before_screen_off.lock());
        if !was_visible {
            return false;
        }

        debug!("Screen on, restoring active consumer");
        self.replay(true)
    }

    fn replay(&self, visible: bool) -> bool {
        let Some(active_handle) = self.manager.active_handle() else {
            return false;
        };

        let consumer = self.active_consumer.lock().as_ref().and_then(Weak::upgrade);
        match consumer {
            Some(consumer) => {
                if consumer.session_handle().as_deref() != Some(&*active_handle) {
                    trace!("Active consumer does not own the active handle");
                    return false;
                }
                consumer.on_visibility_changed(visible);
            }
            None => {
                active_handle.on_visibility_changed(visible, None);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineFactory, EngineInstance, EngineOptions, PlatformContext, Surface};
    use crate::error::Result;

    #[derive(Default)]
    struct CountingEngine {
        calls: Mutex<Vec<&'static str>>,
    }

    impl EngineInstance for CountingEngine {
        fn resume(&self) {
            self.calls.lock().push("resume");
        }
        fn pause(&self) {
            self.calls.lock().push("pause");
        }
        fn window_focus_changed(&self, _has_focus: bool) {}
        fn display_changed(&self, _surface: Option<&Surface>) {}
        fn quit(&self) {}
        fn send_message(&self, _target: &str, _method: &str, _payload: &str) {}
    }

    struct SharedFactory(Arc<CountingEngine>);

    impl EngineFactory for SharedFactory {
        fn create(
            &self,
            _context: &PlatformContext,
            _options: &EngineOptions,
        ) -> Result<Arc<dyn EngineInstance>> {
            Ok(self.0.clone())
        }
    }

    fn setup() -> (Arc<CountingEngine>, Arc<EngineInstanceManager>, ScreenStateMonitor) {
        let engine = Arc::new(CountingEngine::default());
        let manager = Arc::new(EngineInstanceManager::new(Arc::new(SharedFactory(
            engine.clone(),
        ))));
        manager
            .create_directly(&PlatformContext::foreground("test"))
            .unwrap();
        let monitor = ScreenStateMonitor::new(manager.clone());
        (engine, manager, monitor)
    }

    #[test]
    fn test_screen_off_on_replays_active_handle() {
        let (engine, manager, monitor) = setup();
        let handle = manager.create_handle();
        manager.set_active_handle(Some(handle.clone()));
        handle.on_visibility_changed(true, None);

        assert!(monitor.on_screen_off());
        assert!(!handle.is_visible());
        assert!(monitor.on_screen_on());
        assert!(handle.is_visible());
        assert_eq!(*engine.calls.lock(), vec!["resume", "pause", "resume"]);

        // Already consumed.
        assert!(!monitor.on_screen_on());
    }

    #[test]
    fn test_screen_off_without_visible_handles_is_ignored() {
        let (engine, manager, monitor) = setup();
        let handle = manager.create_handle();
        manager.set_active_handle(Some(handle.clone()));
        handle.on_visibility_changed(false, None);

        assert!(!monitor.on_screen_off());
        assert!(!monitor.on_screen_on());
        assert!(engine.calls.lock().is_empty());
    }

    #[test]
    fn test_disabled_monitor_does_nothing() {
        let (_engine, manager, monitor) = setup();
        let handle = manager.create_handle();
        manager.set_active_handle(Some(handle.clone()));
        handle.on_visibility_changed(true, None);

        monitor.set_enabled(false);
        assert!(!monitor.on_screen_off());
        assert!(handle.is_visible());
    }

    #[test]
    fn test_no_registered_handles() {
        let (_engine, _manager, monitor) = setup();
        assert!(!monitor.on_screen_off());
    }
}
