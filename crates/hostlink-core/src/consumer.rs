//! Background live-surface consumer.
//!
//! [`LiveSurfaceSession`] is the glue a live wallpaper style host uses: it
//! owns one session handle, joins or creates the engine, and forwards its
//! lifecycle (visibility, surfaces, offsets, touches) to the coordinator,
//! the notification proxy and the tap detector.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::engine::{EngineHandle, PlatformContext, Surface};
use crate::error::Result;
use crate::events::{DesiredSize, EventNotificationProxy, Offsets};
use crate::gesture::{MultiTapListener, TapGestureDetector};
use crate::instance::{EngineInstanceManager, InstantiationHooks, InstantiationRequest, RequestState};
use crate::runtime::HostRuntime;
use crate::screen::{ScreenStateMonitor, VisibilityConsumer};
use crate::session::SessionHandle;

#[derive(Default)]
struct SurfaceState {
    visible: bool,
    surface: Option<Surface>,
    desired_size: DesiredSize,
    handle: Option<Arc<SessionHandle>>,
    instance: Option<Arc<EngineHandle>>,
}

pub struct LiveSurfaceSession {
    me: Weak<LiveSurfaceSession>,
    is_preview: bool,
    manager: Arc<EngineInstanceManager>,
    proxy: Arc<EventNotificationProxy>,
    tap_detector: Arc<TapGestureDetector>,
    screen_monitor: Arc<ScreenStateMonitor>,
    tap_listener: Arc<dyn MultiTapListener>,
    request: InstantiationRequest,
    state: Mutex<SurfaceState>,
}

impl LiveSurfaceSession {
    /// Create the session and immediately join or create the engine.
    pub fn start(
        runtime: &HostRuntime,
        context: PlatformContext,
        is_preview: bool,
    ) -> Result<Arc<Self>> {
        let session = Self::new(runtime, context, is_preview);
        session.request.instantiate()?;
        Ok(session)
    }

    fn new(runtime: &HostRuntime, context: PlatformContext, is_preview: bool) -> Arc<Self> {
        let manager = Arc::clone(runtime.manager());
        let proxy = Arc::clone(runtime.proxy());
        let tap_proxy = Arc::clone(&proxy);
        let tap_listener: Arc<dyn MultiTapListener> = Arc::new(move |x: f32, y: f32| {
            tap_proxy.multi_tap_detected(x, y);
        });

        Arc::new_cyclic(|me: &Weak<Self>| {
            let hooks: Weak<dyn InstantiationHooks> = me.clone();
            Self {
                me: me.clone(),
                is_preview,
                request: InstantiationRequest::new(Arc::clone(&manager), context, hooks),
                manager,
                proxy,
                tap_detector: Arc::clone(runtime.tap_detector()),
                screen_monitor: Arc::clone(runtime.screen_monitor()),
                tap_listener,
                state: Mutex::new(SurfaceState::default()),
            }
        })
    }

    /// Whether this session renders a preview rather than the live surface.
    pub fn is_preview(&self) -> bool {
        self.is_preview
    }

    /// Progress of the underlying instantiation request.
    pub fn request_state(&self) -> RequestState {
        self.request.state()
    }

    /// Session handle, once the request has bound one.
    pub fn handle(&self) -> Option<Arc<SessionHandle>> {
        self.state.lock().handle.clone()
    }

    /// Engine instance, once bound.
    pub fn instance(&self) -> Option<Arc<EngineHandle>> {
        self.state.lock().instance.clone()
    }

    fn is_active(&self, handle: &SessionHandle) -> bool {
        self.manager.active_handle().is_none() || self.manager.is_active(handle)
    }

    fn register_as_screen_consumer(&self) {
        let consumer: Weak<dyn VisibilityConsumer> = self.me.clone();
        self.screen_monitor.set_active_consumer(consumer);
    }

    /// The host shows or hides this surface. Returns whether the engine's
    /// running state changed.
    pub fn on_visibility_changed(&self, visible: bool) -> bool {
        let (handle, surface, desired) = {
            let mut state = self.state.lock();
            state.visible = visible;
            (state.handle.clone(), state.surface, state.desired_size)
        };
        let Some(handle) = handle else {
            return false;
        };
        trace!("Live surface {} visible={}", handle.id(), visible);

        if visible {
            self.manager.set_active_handle(Some(Arc::clone(&handle)));
            self.register_as_screen_consumer();
            self.tap_detector.register_listener(Arc::clone(&self.tap_listener));
            self.tap_detector.set_screen_size(
                desired.width.max(0) as u32,
                desired.height.max(0) as u32,
            );

            let changed = handle.on_visibility_changed(true, surface);

            self.proxy.desired_size_changed(desired.width, desired.height);
            self.proxy.visibility_changed(true);
            self.proxy.preview_changed(self.is_preview);
            changed
        } else {
            self.tap_detector.unregister_listener(&self.tap_listener);
            // Queue before pausing so the engine sees it while still running.
            if self.is_active(&handle) {
                self.proxy.visibility_changed(false);
            }
            handle.on_visibility_changed(false, None)
        }
    }

    /// Remember `surface`; it is attached on the next visibility change.
    pub fn on_surface_created(&self, surface: Surface) {
        self.state.lock().surface = Some(surface);
    }

    /// Attach `surface` to the engine immediately if it is bound.
    pub fn on_surface_changed(&self, surface: Surface) {
        let instance = {
            let mut state = self.state.lock();
            state.surface = Some(surface);
            state.instance.clone()
        };
        if let Some(instance) = instance {
            instance.set_surface(Some(surface));
        }
    }

    /// Detach `surface` if it is the one the engine is using.
    pub fn on_surface_destroyed(&self, surface: Surface) {
        let instance = {
            let mut state = self.state.lock();
            if state.surface == Some(surface) {
                state.surface = None;
            }
            state.instance.clone()
        };
        if let Some(instance) = instance {
            instance.handle_surface_destroyed(&surface);
        }
    }

    /// Forward scroll offsets to the proxy.
    pub fn on_offsets_changed(&self, offsets: Offsets) -> bool {
        self.proxy.offsets_changed(offsets)
    }

    /// Record the new desired size; it is forwarded only while this session
    /// is active.
    pub fn on_desired_size_changed(&self, width: i32, height: i32) -> bool {
        let handle = {
            let mut state = self.state.lock();
            state.desired_size = DesiredSize { width, height };
            state.handle.clone()
        };
        match handle {
            Some(handle) if self.is_active(&handle) => {
                self.proxy.desired_size_changed(width, height)
            }
            _ => false,
        }
    }

    /// Feed a touch-down to the tap detector. Ignored until the engine is
    /// bound.
    pub fn on_touch_down(&self, t_ms: u64, x: f32, y: f32) -> bool {
        if self.instance().is_none() {
            return false;
        }
        self.tap_detector.on_tap_down(t_ms, x, y)
    }

    /// Tear the session down. Returns `true` when no session handles remain
    /// registered, i.e. the host may shut its service down.
    pub fn destroy(&self) -> bool {
        self.tap_detector.unregister_listener(&self.tap_listener);
        if let Some(handle) = self.handle() {
            self.screen_monitor.clear_active_consumer_if(&handle);
            self.manager.clear_active_handle_if(&handle);
            handle.unregister();
        }
        let remaining = self.manager.coordinator().registered_count();
        debug!("Live surface destroyed, {} handles remain", remaining);
        remaining == 0
    }
}

impl InstantiationHooks for LiveSurfaceSession {
    fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    fn surface(&self) -> Option<Surface> {
        self.state.lock().surface
    }

    fn on_already_ready(&self) {
        trace!("Live surface joined existing engine");
    }

    fn on_instance_ready(&self) {
        self.register_as_screen_consumer();

        // Visibility recorded before the engine existed is not replayed by
        // the coordinator, so bring the engine up here.
        let (visible, surface, instance) = {
            let state = self.state.lock();
            (state.visible, state.surface, state.instance.clone())
        };
        if let (true, Some(instance)) = (visible, instance) {
            if surface.is_some() {
                instance.set_surface(surface);
            }
            if self.manager.coordinator().resume_if_visible() {
                debug!("Engine ready while visible, resumed");
            }
        }
    }

    fn on_bind_instance(&self, instance: &Arc<EngineHandle>) {
        self.state.lock().instance = Some(Arc::clone(instance));
    }

    fn on_bind_handle(&self, handle: &Arc<SessionHandle>) {
        self.state.lock().handle = Some(Arc::clone(handle));
    }
}

impl VisibilityConsumer for LiveSurfaceSession {
    fn session_handle(&self) -> Option<Arc<SessionHandle>> {
        self.handle()
    }

    fn on_visibility_changed(&self, visible: bool) -> bool {
        LiveSurfaceSession::on_visibility_changed(self, visible)
    }
}
