//! Per-consumer visibility lease.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::Surface;
use crate::session::coordinator::EngineSessionCoordinator;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`SessionHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// A consumer's lease on the engine.
///
/// The handle is not counted until its first visibility change registers it
/// with the coordinator. Handles compare by identity.
pub struct SessionHandle {
    id: HandleId,
    /// Shared with the coordinator, which writes it under its own lock.
    visible: Arc<AtomicBool>,
    coordinator: Arc<EngineSessionCoordinator>,
}

impl SessionHandle {
    pub(crate) fn new(coordinator: Arc<EngineSessionCoordinator>) -> Self {
        Self {
            id: HandleId::next(),
            visible: Arc::new(AtomicBool::new(false)),
            coordinator,
        }
    }

    /// Identity of this handle.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Visibility last reported through this handle.
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub(crate) fn visibility_flag(&self) -> &Arc<AtomicBool> {
        &self.visible
    }

    /// Report a visibility change, optionally with a new surface.
    ///
    /// Returns whether the engine's running state changed as a result.
    pub fn on_visibility_changed(&self, visible: bool, surface: Option<Surface>) -> bool {
        self.coordinator
            .handle_visibility_changed(self, visible, surface)
    }

    /// Force the handle invisible, then remove it from the coordinator.
    pub fn unregister(&self) {
        self.on_visibility_changed(false, None);
        self.coordinator.unregister(self);
    }
}

impl PartialEq for SessionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SessionHandle {}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("visible", &self.is_visible())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_have_distinct_identity() {
        let coordinator = Arc::new(EngineSessionCoordinator::new());
        let a = EngineSessionCoordinator::create_handle(&coordinator);
        let b = EngineSessionCoordinator::create_handle(&coordinator);
        assert_ne!(a.id(), b.id());
        assert_ne!(*a, *b);
        assert_eq!(*a, *a);
    }

    #[test]
    fn test_new_handle_is_invisible_and_unregistered() {
        let coordinator = Arc::new(EngineSessionCoordinator::new());
        let handle = EngineSessionCoordinator::create_handle(&coordinator);
        assert!(!handle.is_visible());
        assert_eq!(coordinator.registered_count(), 0);
        assert_eq!(coordinator.visible_count(), 0);
    }

    #[test]
    fn test_unregister_forces_invisible() {
        let coordinator = Arc::new(EngineSessionCoordinator::new());
        let handle = EngineSessionCoordinator::create_handle(&coordinator);
        handle.on_visibility_changed(true, None);
        assert_eq!(coordinator.visible_count(), 1);

        handle.unregister();
        assert!(!handle.is_visible());
        assert_eq!(coordinator.visible_count(), 0);
        assert_eq!(coordinator.registered_count(), 0);
    }
}
