//! Aggregate visibility tracking for the shared engine.
//!
//! The coordinator counts visible [`SessionHandle`]s and drives the engine
//! through resume/pause only when that count crosses zero. Visibility changes
//! reported before an engine is bound are recorded but never replayed: the
//! code that observes instance creation brings the engine up through
//! [`EngineSessionCoordinator::resume_if_visible`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::engine::{EngineHandle, Surface};
use crate::session::handle::{HandleId, SessionHandle};

struct CoordinatorState {
    handles: HashMap<HandleId, Arc<AtomicBool>>,
    previous_visible_count: usize,
    is_paused: bool,
    /// Whether the engine was last resumed rather than paused.
    engine_running: bool,
    engine: Option<Arc<EngineHandle>>,
}

impl CoordinatorState {
    fn visible_count(&self) -> usize {
        self.handles
            .values()
            .filter(|visible| visible.load(Ordering::Acquire))
            .count()
    }
}

/// Owns the set of registered handles and the engine transitions they cause.
pub struct EngineSessionCoordinator {
    state: Mutex<CoordinatorState>,
}

impl EngineSessionCoordinator {
    /// Create an empty coordinator with no engine bound.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CoordinatorState {
                handles: HashMap::new(),
                previous_visible_count: 0,
                is_paused: false,
                engine_running: false,
                engine: None,
            }),
        }
    }

    /// Create a fresh, unregistered handle bound to this coordinator.
    pub fn create_handle(this: &Arc<Self>) -> Arc<SessionHandle> {
        Arc::new(SessionHandle::new(Arc::clone(this)))
    }

    /// Bind the engine. Recorded visibility is not replayed.
    pub fn bind_instance(&self, engine: Arc<EngineHandle>) {
        let mut state = self.state.lock();
        debug!(
            "Binding engine to coordinator ({} registered, {} visible)",
            state.handles.len(),
            state.previous_visible_count
        );
        state.engine = Some(engine);
        state.engine_running = false;
    }

    /// Resume the bound engine if any handle is visible and the engine is
    /// not already running. Returns whether `resume` was called.
    ///
    /// Consumers that became visible before the engine existed call this
    /// once the engine is ready; however many of them do, the engine is
    /// resumed once.
    pub fn resume_if_visible(&self) -> bool {
        let mut state = self.state.lock();
        let Some(engine) = state.engine.clone() else {
            return false;
        };
        let visible_count = state.visible_count();
        if visible_count == 0 || state.engine_running {
            return false;
        }
        debug!("Engine ready with {} visible, resuming", visible_count);
        engine.resume();
        state.engine_running = true;
        state.is_paused = false;
        state.previous_visible_count = visible_count;
        true
    }

    /// Whether an engine is bound.
    pub fn has_instance(&self) -> bool {
        self.state.lock().engine.is_some()
    }

    /// Apply a visibility change reported by `handle`.
    ///
    /// Registers the handle if it is unseen. Returns `true` when the visible
    /// count changed while an engine was bound; the engine itself is only
    /// resumed on a 0 to non-zero crossing and paused on the reverse.
    pub fn handle_visibility_changed(
        &self,
        handle: &SessionHandle,
        visible: bool,
        surface: Option<Surface>,
    ) -> bool {
        let mut state = self.state.lock();

        state
            .handles
            .entry(handle.id())
            .or_insert_with(|| Arc::clone(handle.visibility_flag()));
        handle.visibility_flag().store(visible, Ordering::Release);

        let visible_count = state.visible_count();
        let previous = state.previous_visible_count;
        state.previous_visible_count = visible_count;

        let Some(engine) = state.engine.clone() else {
            trace!(
                "{} visible={} before engine exists ({} visible)",
                handle.id(),
                visible,
                visible_count
            );
            return false;
        };

        trace!("{} visible={} ({} visible)", handle.id(), visible, visible_count);

        if let Some(surface) = surface {
            engine.set_surface(Some(surface));
        }

        if visible_count == previous {
            return false;
        }

        let now_paused = visible_count == 0;
        if previous == 0 && !now_paused && !state.engine_running {
            debug!("Visible count {} -> {}, resuming engine", previous, visible_count);
            engine.resume();
            state.engine_running = true;
        } else if previous > 0 && now_paused && state.engine_running {
            debug!("Visible count {} -> 0, pausing engine", previous);
            engine.pause();
            state.engine_running = false;
        }
        state.is_paused = now_paused;
        true
    }

    /// Remove `handle` without touching the engine.
    ///
    /// Callers force the handle invisible first; see
    /// [`SessionHandle::unregister`].
    pub fn unregister(&self, handle: &SessionHandle) {
        let mut state = self.state.lock();
        if state.handles.remove(&handle.id()).is_some() {
            trace!("Unregistered {} ({} remaining)", handle.id(), state.handles.len());
        }
    }

    /// Number of registered handles currently visible.
    pub fn visible_count(&self) -> usize {
        self.state.lock().visible_count()
    }

    /// Number of handles that have reported visibility and not unregistered.
    pub fn registered_count(&self) -> usize {
        self.state.lock().handles.len()
    }

    /// Whether the last applied transition paused the engine.
    pub fn is_paused(&self) -> bool {
        self.state.lock().is_paused
    }

    /// Whether the engine was resumed and has not been paused since.
    pub fn is_engine_running(&self) -> bool {
        self.state.lock().engine_running
    }
}

impl Default for EngineSessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
