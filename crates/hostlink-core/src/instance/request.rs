//! Instantiate-or-join workflow for a single consumer.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::engine::{EngineHandle, PlatformContext, Surface};
use crate::error::{HostError, Result};
use crate::instance::manager::EngineInstanceManager;
use crate::session::SessionHandle;

/// Consumer callbacks driven by an [`InstantiationRequest`].
pub trait InstantiationHooks: Send + Sync {
    /// Current visibility of the consumer.
    fn is_visible(&self) -> bool;

    /// Surface the consumer would attach, if any.
    fn surface(&self) -> Option<Surface>;

    /// The engine already existed when the request started.
    fn on_already_ready(&self);

    /// The engine was created after the request started.
    fn on_instance_ready(&self);

    fn on_bind_instance(&self, instance: &Arc<EngineHandle>);

    fn on_bind_handle(&self, handle: &Arc<SessionHandle>);
}

/// Outcome of one creation attempt, shared with its listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Pending,
    Fired,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    NotStarted,
    /// Waiting for the engine to be created.
    Waiting,
    Ready,
}

/// Obtains a session handle for one consumer and joins, or triggers
/// creation of, the shared engine.
pub struct InstantiationRequest {
    manager: Arc<EngineInstanceManager>,
    context: PlatformContext,
    hooks: Weak<dyn InstantiationHooks>,
    state: Arc<Mutex<RequestState>>,
    handle: Mutex<Option<Arc<SessionHandle>>>,
}

impl InstantiationRequest {
    /// Create a request for `context`. `hooks` is held weakly.
    pub fn new(
        manager: Arc<EngineInstanceManager>,
        context: PlatformContext,
        hooks: Weak<dyn InstantiationHooks>,
    ) -> Self {
        Self {
            manager,
            context,
            hooks,
            state: Arc::new(Mutex::new(RequestState::NotStarted)),
            handle: Mutex::new(None),
        }
    }

    /// Run the workflow. May only be called once per request.
    ///
    /// If the engine exists, the handle and instance are bound and
    /// `on_already_ready` runs before this returns. Otherwise a one-shot
    /// listener is registered and creation is requested; `on_instance_ready`
    /// runs once the engine exists, after which this request's handle
    /// becomes the active handle.
    ///
    /// If requesting creation fails, the listener is disarmed, the handle is
    /// released and the request returns to [`RequestState::NotStarted`] so it
    /// can be retried.
    pub fn instantiate(&self) -> Result<()> {
        let hooks = {
            let mut state = self.state.lock();
            if *state != RequestState::NotStarted {
                return Err(HostError::AlreadyInstantiated);
            }
            let hooks = self.hooks.upgrade().ok_or(HostError::HooksUnavailable)?;
            *state = RequestState::Waiting;
            hooks
        };

        let handle = self.manager.create_handle();
        *self.handle.lock() = Some(Arc::clone(&handle));
        hooks.on_bind_handle(&handle);

        if let Some(instance) = self.manager.instance() {
            debug!("Engine already exists, joining from {}", self.context);
            hooks.on_bind_instance(&instance);
            *self.state.lock() = RequestState::Ready;
            hooks.on_already_ready();
            return Ok(());
        }

        debug!("Engine missing, requesting creation from {}", self.context);
        let attempt = Arc::new(Mutex::new(Attempt::Pending));
        let listener_attempt = Arc::clone(&attempt);
        let listener_handle = Arc::clone(&handle);
        let weak_hooks = self.hooks.clone();
        let weak_manager = Arc::downgrade(&self.manager);
        let state = Arc::clone(&self.state);
        self.manager
            .register_instance_created_listener(move |instance: &Arc<EngineHandle>| {
                let handle = listener_handle;
                {
                    let mut attempt = listener_attempt.lock();
                    if *attempt == Attempt::Abandoned {
                        trace!("Ignoring instance-created event for abandoned {}", handle.id());
                        return;
                    }
                    *attempt = Attempt::Fired;
                }
                trace!("Instance-created event received for {}", handle.id());
                *state.lock() = RequestState::Ready;
                if let Some(hooks) = weak_hooks.upgrade() {
                    hooks.on_bind_instance(instance);
                    hooks.on_instance_ready();
                }
                if let Some(manager) = weak_manager.upgrade() {
                    manager.set_active_handle(Some(handle));
                }
            });

        let Err(e) = self.manager.request_create(self.context.clone()) else {
            return Ok(());
        };

        {
            let mut attempt = attempt.lock();
            if *attempt == Attempt::Fired {
                // Another caller created the engine in the meantime.
                debug!("Creation from {} failed but the engine exists: {}", self.context, e);
                return Ok(());
            }
            *attempt = Attempt::Abandoned;
        }
        warn!("Instantiation from {} failed: {}", self.context, e);
        handle.unregister();
        *self.handle.lock() = None;
        *self.state.lock() = RequestState::NotStarted;
        Err(e)
    }

    /// Current progress of the request.
    pub fn state(&self) -> RequestState {
        *self.state.lock()
    }

    /// Handle obtained by [`instantiate`](Self::instantiate), if any.
    pub fn handle(&self) -> Option<Arc<SessionHandle>> {
        self.handle.lock().clone()
    }

    /// Manager this request instantiates against.
    pub fn manager(&self) -> &Arc<EngineInstanceManager> {
        &self.manager
    }

    /// Push the consumer's current visibility and surface to its handle.
    ///
    /// Returns `false` when nothing was applied, including when the request
    /// has not produced a handle yet.
    pub fn apply_current_visibility(&self) -> bool {
        let (Some(handle), Some(hooks)) = (self.handle(), self.hooks.upgrade()) else {
            return false;
        };
        handle.on_visibility_changed(hooks.is_visible(), hooks.surface())
    }
}
