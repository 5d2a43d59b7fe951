//! Event channels and the notification proxy built from them.

mod immediate;
pub(crate) mod listeners;
mod proxy;
mod queued;

pub use immediate::ImmediateDispatcher;
pub use listeners::ListenerSet;
pub use proxy::{DesiredSize, EngineEventsListener, EventNotificationProxy, Offsets, TapPosition};
pub use queued::{QueuedDispatcher, QueuedEvent};
