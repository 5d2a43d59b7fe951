//! Create-once gate around the engine instance.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

use crate::engine::{
    CreationRelay, EngineCapabilities, EngineFactory, EngineHandle, EngineOptions,
    PlatformContext,
};
use crate::error::{HostError, Result};
use crate::instance::notifier::{fire_one, InstanceCreatedCallback, OneShotNotifier};
use crate::session::{EngineSessionCoordinator, SessionHandle};

struct ManagerState {
    instance: Option<Arc<EngineHandle>>,
    created_listeners: OneShotNotifier,
}

/// Owns the single engine instance and the coordinator that drives it.
///
/// The factory is invoked at most once, no matter how many threads call
/// [`request_create`](Self::request_create) or
/// [`create_directly`](Self::create_directly) concurrently.
pub struct EngineInstanceManager {
    factory: Arc<dyn EngineFactory>,
    relay: Option<Arc<dyn CreationRelay>>,
    options: EngineOptions,
    capabilities: EngineCapabilities,
    coordinator: Arc<EngineSessionCoordinator>,
    state: Mutex<ManagerState>,
    active_handle: Mutex<Option<Arc<SessionHandle>>>,
    ready_tx: watch::Sender<Option<Arc<EngineHandle>>>,
}

impl EngineInstanceManager {
    /// Create a manager for `factory`. Capabilities are derived from the
    /// version the factory reports.
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        let capabilities = EngineCapabilities::for_version(factory.version().as_deref());
        let (ready_tx, _) = watch::channel(None);
        Self {
            factory,
            relay: None,
            options: EngineOptions::default(),
            capabilities,
            coordinator: Arc::new(EngineSessionCoordinator::new()),
            state: Mutex::new(ManagerState {
                instance: None,
                created_listeners: OneShotNotifier::new(),
            }),
            active_handle: Mutex::new(None),
            ready_tx,
        }
    }

    /// Route construction through `relay` for contexts that cannot build
    /// the engine themselves.
    pub fn with_relay(mut self, relay: Arc<dyn CreationRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Options handed to the factory on construction.
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Override the capabilities derived from the factory's version.
    pub fn with_capabilities(mut self, capabilities: EngineCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Capabilities of the embedded engine.
    pub fn capabilities(&self) -> &EngineCapabilities {
        &self.capabilities
    }

    /// Whether `context` may be handed to the factory as is.
    pub fn can_construct_from(&self, context: &PlatformContext) -> bool {
        context.is_foreground() || self.capabilities.background_construction
    }

    /// Ask for the engine to be created on behalf of `context`.
    ///
    /// Construction-capable contexts create synchronously. Anything else is
    /// handed to the configured [`CreationRelay`], which calls back into
    /// [`create_directly`](Self::create_directly) later.
    pub fn request_create(self: &Arc<Self>, context: PlatformContext) -> Result<()> {
        if self.state.lock().instance.is_some() {
            trace!("Engine already exists, ignoring create request from {}", context);
            return Ok(());
        }

        if self.can_construct_from(&context) {
            return self.create_directly(&context);
        }

        let Some(relay) = &self.relay else {
            return Err(HostError::EngineCreation {
                message: format!(
                    "{} cannot construct engine {} and no creation relay is configured",
                    context, self.capabilities.version
                ),
            });
        };

        debug!("Relaying engine creation for {}", context);
        let manager = Arc::downgrade(self);
        relay.schedule(
            context,
            Box::new(move |construction_context| match manager.upgrade() {
                Some(manager) => manager.create_directly(&construction_context),
                None => {
                    warn!("Creation relay fired after the instance manager was dropped");
                    Err(HostError::InstanceUnavailable)
                }
            }),
        );
        Ok(())
    }

    /// Construct the engine with `context` unless it already exists, then
    /// notify every pending instance-created listener once.
    pub fn create_directly(&self, context: &PlatformContext) -> Result<()> {
        let (instance, listeners) = {
            let mut state = self.state.lock();
            if state.instance.is_some() {
                return Ok(());
            }

            info!("Instantiating engine from {}", context);
            let raw = self.factory.create(context, &self.options).map_err(|e| {
                error!("Engine factory failed: {}", e);
                match e {
                    creation @ HostError::EngineCreation { .. } => creation,
                    other => HostError::EngineCreation {
                        message: other.to_string(),
                    },
                }
            })?;

            let instance = Arc::new(EngineHandle::new(raw, context.clone(), &self.options));
            self.coordinator.bind_instance(Arc::clone(&instance));
            state.instance = Some(Arc::clone(&instance));
            (instance, state.created_listeners.take())
        };

        self.ready_tx.send_replace(Some(Arc::clone(&instance)));
        trace!("Notifying {} instance-created listeners", listeners.len());
        OneShotNotifier::fire(listeners, &instance);
        Ok(())
    }

    /// Run `listener` once the engine exists. If it already does, the
    /// listener runs synchronously before this returns. Listeners must not
    /// register further listeners from inside the callback.
    pub fn register_instance_created_listener<F>(&self, listener: F)
    where
        F: FnOnce(&Arc<EngineHandle>) + Send + 'static,
    {
        let callback: InstanceCreatedCallback = Box::new(listener);
        let mut state = self.state.lock();
        if let Some(instance) = state.instance.clone() {
            drop(state);
            fire_one(callback, &instance);
            return;
        }
        state.created_listeners.push(callback);
    }

    /// The engine instance, if it has been created.
    pub fn instance(&self) -> Option<Arc<EngineHandle>> {
        self.state.lock().instance.clone()
    }

    /// Wait until the engine has been created.
    pub async fn wait_for_instance(&self) -> Result<Arc<EngineHandle>> {
        let mut rx = self.ready_tx.subscribe();
        let ready = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| HostError::InstanceUnavailable)?
            .clone();
        ready.ok_or(HostError::InstanceUnavailable)
    }

    /// The coordinator that drives the engine's resume and pause.
    pub fn coordinator(&self) -> &Arc<EngineSessionCoordinator> {
        &self.coordinator
    }

    /// New unregistered handle on this manager's coordinator.
    pub fn create_handle(&self) -> Arc<SessionHandle> {
        EngineSessionCoordinator::create_handle(&self.coordinator)
    }

    /// Handle of the consumer currently driving the engine, if any.
    pub fn active_handle(&self) -> Option<Arc<SessionHandle>> {
        self.active_handle.lock().clone()
    }

    /// Replace the active handle.
    pub fn set_active_handle(&self, handle: Option<Arc<SessionHandle>>) {
        let mut active = self.active_handle.lock();
        match &handle {
            Some(h) => trace!("Active handle is now {}", h.id()),
            None => trace!("Active handle cleared"),
        }
        *active = handle;
    }

    /// Whether `handle` is the active handle.
    pub fn is_active(&self, handle: &SessionHandle) -> bool {
        self.active_handle
            .lock()
            .as_deref()
            .is_some_and(|active| active == handle)
    }

    /// Clear the active slot if it holds `handle`. Returns whether it did.
    pub fn clear_active_handle_if(&self, handle: &SessionHandle) -> bool {
        let mut active = self.active_handle.lock();
        if active.as_deref().is_some_and(|a| a == handle) {
            *active = None;
            return true;
        }
        false
    }

    /// True until the engine exists and whenever it is paused.
    pub fn is_paused(&self) -> bool {
        self.instance().is_none() || self.coordinator.is_paused()
    }

    #[cfg(test)]
    pub(crate) fn pending_listener_count(&self) -> usize {
        self.state.lock().created_listeners.len()
    }
}
