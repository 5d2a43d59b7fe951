//! Host-to-engine state notifications.
//!
//! Producers on any thread report state changes to the
//! [`EventNotificationProxy`]; a pump calls
//! [`dispatch_all`](EventNotificationProxy::dispatch_all) to forward them to
//! every registered [`EngineEventsListener`]. Discrete events (visibility,
//! preference keys, activity triggers, custom events) are queued in order;
//! continuous state (offsets, preview flag, desired size, multi-tap position)
//! is coalesced to its latest value.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::events::immediate::ImmediateDispatcher;
use crate::events::listeners::ListenerSet;
use crate::events::queued::{QueuedDispatcher, QueuedEvent};

/// Scroll offsets of a live surface across its virtual pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offsets {
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_offset_step: f32,
    pub y_offset_step: f32,
    pub x_pixel_offset: i32,
    pub y_pixel_offset: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredSize {
    pub width: i32,
    pub height: i32,
}

/// Position of the final tap of a recognized multi-tap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TapPosition {
    pub x: f32,
    pub y: f32,
}

/// Receives engine-bound notifications. Every method defaults to a no-op.
pub trait EngineEventsListener: Send + Sync {
    fn visibility_changed(&self, _visible: bool) {}

    fn offsets_changed(&self, _offsets: Offsets) {}

    fn preview_changed(&self, _is_preview: bool) {}

    fn desired_size_changed(&self, _size: DesiredSize) {}

    fn preference_changed(&self, _key: &str) {}

    fn preferences_activity_triggered(&self) {}

    fn multi_tap_detected(&self, _position: TapPosition) {}

    fn custom_event_received(&self, _name: &str, _data: &str) {}
}

struct VisibilityChanged(bool);

impl QueuedEvent for VisibilityChanged {
    fn is_duplicate_of(&self, previous: &Self) -> bool {
        self.0 == previous.0
    }
}

struct PreferenceChanged(String);

impl QueuedEvent for PreferenceChanged {
    fn is_duplicate_of(&self, previous: &Self) -> bool {
        self.0 == previous.0
    }
}

struct ActivityTriggered;

impl QueuedEvent for ActivityTriggered {
    fn is_duplicate_of(&self, _previous: &Self) -> bool {
        false
    }
}

struct CustomEvent {
    name: String,
    data: String,
}

impl QueuedEvent for CustomEvent {
    fn is_duplicate_of(&self, _previous: &Self) -> bool {
        false
    }
}

/// One channel per signal, plus the listeners they all deliver to.
pub struct EventNotificationProxy {
    listeners: ListenerSet<dyn EngineEventsListener>,
    visibility: QueuedDispatcher<VisibilityChanged>,
    offsets: ImmediateDispatcher<Offsets>,
    preview: ImmediateDispatcher<bool>,
    desired_size: ImmediateDispatcher<DesiredSize>,
    preference: QueuedDispatcher<PreferenceChanged>,
    activity_triggered: QueuedDispatcher<ActivityTriggered>,
    multi_tap: ImmediateDispatcher<TapPosition>,
    custom_event: QueuedDispatcher<CustomEvent>,
}

impl EventNotificationProxy {
    /// Create a proxy with empty channels and no listeners.
    pub fn new() -> Self {
        Self {
            listeners: ListenerSet::new(),
            visibility: QueuedDispatcher::new(),
            offsets: ImmediateDispatcher::new(),
            preview: ImmediateDispatcher::new(),
            desired_size: ImmediateDispatcher::new(),
            preference: QueuedDispatcher::new(),
            activity_triggered: QueuedDispatcher::new(),
            multi_tap: ImmediateDispatcher::new(),
            custom_event: QueuedDispatcher::new(),
        }
    }

    /// Add `listener`. Registering the same listener twice is a no-op.
    pub fn register_listener(&self, listener: Arc<dyn EngineEventsListener>) -> bool {
        self.listeners.register(listener)
    }

    /// Remove `listener`. Returns false if it was not registered.
    pub fn unregister_listener(&self, listener: &Arc<dyn EngineEventsListener>) -> bool {
        self.listeners.unregister(listener)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Queue a visibility change.
    pub fn visibility_changed(&self, visible: bool) -> bool {
        self.visibility.enqueue(VisibilityChanged(visible))
    }

    /// Record the latest scroll offsets.
    pub fn offsets_changed(&self, offsets: Offsets) -> bool {
        self.offsets.record(offsets)
    }

    /// Record whether the active consumer is a preview.
    pub fn preview_changed(&self, is_preview: bool) -> bool {
        self.preview.record(is_preview)
    }

    /// Record the desired surface size.
    pub fn desired_size_changed(&self, width: i32, height: i32) -> bool {
        self.desired_size.record(DesiredSize { width, height })
    }

    /// Queue a changed preference key.
    pub fn preference_changed(&self, key: impl Into<String>) -> bool {
        self.preference.enqueue(PreferenceChanged(key.into()))
    }

    /// Queue a preferences screen trigger. Never deduplicated.
    pub fn preferences_activity_triggered(&self) -> bool {
        self.activity_triggered.enqueue(ActivityTriggered)
    }

    /// Record the position of a recognized multi-tap.
    pub fn multi_tap_detected(&self, x: f32, y: f32) -> bool {
        self.multi_tap.record(TapPosition { x, y })
    }

    /// Queue a named custom event. Never deduplicated.
    pub fn custom_event_received(&self, name: impl Into<String>, data: impl Into<String>) -> bool {
        self.custom_event.enqueue(CustomEvent {
            name: name.into(),
            data: data.into(),
        })
    }

    /// Forward every pending notification to the listeners.
    ///
    /// Channels are drained in a fixed order: visibility, offsets, preview,
    /// desired size, preference, activity trigger, multi-tap, custom events.
    /// Returns the number of events dispatched.
    pub fn dispatch_all(&self) -> usize {
        let listeners = &self.listeners;
        let mut dispatched = 0;

        dispatched += self.visibility.dispatch(|e| {
            listeners.notify("visibility_changed", |l| l.visibility_changed(e.0));
        });
        dispatched += usize::from(self.offsets.dispatch(|offsets| {
            listeners.notify("offsets_changed", |l| l.offsets_changed(*offsets));
        }));
        dispatched += usize::from(self.preview.dispatch(|is_preview| {
            listeners.notify("preview_changed", |l| l.preview_changed(*is_preview));
        }));
        dispatched += usize::from(self.desired_size.dispatch(|size| {
            listeners.notify("desired_size_changed", |l| l.desired_size_changed(*size));
        }));
        dispatched += self.preference.dispatch(|e| {
            listeners.notify("preference_changed", |l| l.preference_changed(&e.0));
        });
        dispatched += self.activity_triggered.dispatch(|_| {
            listeners.notify("preferences_activity_triggered", |l| {
                l.preferences_activity_triggered()
            });
        });
        dispatched += usize::from(self.multi_tap.dispatch(|position| {
            listeners.notify("multi_tap_detected", |l| l.multi_tap_detected(*position));
        }));
        dispatched += self.custom_event.dispatch(|e| {
            listeners.notify("custom_event_received", |l| {
                l.custom_event_received(&e.name, &e.data)
            });
        });

        if dispatched > 0 {
            trace!(
                "Dispatched {} events to {} listeners",
                dispatched,
                listeners.len()
            );
        }
        dispatched
    }
}

impl Default for EventNotificationProxy {
    fn default() -> Self {
        Self::new()
    }
}
