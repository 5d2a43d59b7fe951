//! hostlink - lifecycle coordination for a single shared embedded engine.
//!
//! A host process may embed one expensive engine instance that several
//! independent consumers (a foreground screen, a background live surface, an
//! embedded view) attach to and detach from on their own schedules. hostlink
//! makes sure that:
//!
//! - the engine is constructed at most once ([`EngineInstanceManager`]);
//! - it runs only while at least one consumer is visible
//!   ([`EngineSessionCoordinator`], [`SessionHandle`]);
//! - consumers can join an existing engine or trigger its creation without
//!   racing each other ([`InstantiationRequest`]);
//! - state changes reach the engine without flooding it with redundant
//!   notifications ([`EventNotificationProxy`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hostlink::{HostRuntime, LiveSurfaceSession, PlatformContext, Surface};
//!
//! let runtime = HostRuntime::builder(Arc::new(MyEngineFactory)).build()?;
//! runtime.start_pump()?;
//!
//! let wallpaper = LiveSurfaceSession::start(
//!     &runtime,
//!     PlatformContext::background("wallpaper"),
//!     false,
//! )?;
//! wallpaper.on_surface_created(Surface::new(1, 1080, 1920));
//! wallpaper.on_visibility_changed(true);
//! ```

pub mod cancel;
pub mod config;
pub mod consumer;
pub mod engine;
pub mod error;
pub mod events;
pub mod gesture;
pub mod instance;
pub mod prefs;
pub mod pump;
pub mod runtime;
pub mod screen;
pub mod session;

pub use cancel::CancellationToken;
pub use config::{DispatchConfig, EngineConfig, HostConfig, TapConfig, TapSettings};
pub use consumer::LiveSurfaceSession;
pub use engine::{
    ContextConfigurator, ContextKind, CreateCallback, CreationRelay, EngineCapabilities,
    EngineFactory, EngineHandle, EngineInstance, EngineOptions, EngineVersion, PlatformContext,
    Surface,
};
pub use error::{HostError, Result};
pub use events::{
    DesiredSize, EngineEventsListener, EventNotificationProxy, ImmediateDispatcher, ListenerSet,
    Offsets, QueuedDispatcher, QueuedEvent, TapPosition,
};
pub use gesture::{MultiTapListener, TapGestureDetector};
pub use instance::{
    EngineInstanceManager, InstanceCreatedCallback, InstantiationHooks, InstantiationRequest,
    OneShotNotifier, RequestState,
};
pub use prefs::{CachedPreference, DataChangedFlag, JsonFileStore, KeyValueStore, MemoryStore};
pub use pump::run_dispatch_pump;
pub use runtime::{HostRuntime, HostRuntimeBuilder};
pub use screen::{ScreenStateMonitor, VisibilityConsumer};
pub use session::{EngineSessionCoordinator, HandleId, SessionHandle};
