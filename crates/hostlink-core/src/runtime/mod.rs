//! Explicitly constructed runtime context.
//!
//! [`HostRuntime`] owns everything a host process needs: the instance
//! manager, the notification proxy, the tap detector, the screen monitor and
//! the optional dispatch pump. The host builds it at startup and calls
//! [`HostRuntime::teardown`] when it shuts down.

mod builder;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::config::HostConfig;
use crate::engine::EngineFactory;
use crate::error::{HostError, Result};
use crate::events::EventNotificationProxy;
use crate::gesture::TapGestureDetector;
use crate::instance::EngineInstanceManager;
use crate::pump::run_dispatch_pump;
use crate::screen::ScreenStateMonitor;

pub use builder::HostRuntimeBuilder;

struct PumpTask {
    token: CancellationToken,
    join: JoinHandle<usize>,
}

pub struct HostRuntime {
    config: HostConfig,
    manager: Arc<EngineInstanceManager>,
    proxy: Arc<EventNotificationProxy>,
    tap_detector: Arc<TapGestureDetector>,
    screen_monitor: Arc<ScreenStateMonitor>,
    pump: Mutex<Option<PumpTask>>,
    torn_down: AtomicBool,
}

impl HostRuntime {
    /// Start configuring a runtime for `factory`.
    pub fn builder(factory: Arc<dyn EngineFactory>) -> HostRuntimeBuilder {
        HostRuntimeBuilder::new(factory)
    }

    fn assemble(manager: Arc<EngineInstanceManager>, config: HostConfig) -> Result<Self> {
        let tap_detector = Arc::new(TapGestureDetector::new(&config.tap)?);
        let screen_monitor = Arc::new(ScreenStateMonitor::new(Arc::clone(&manager)));
        Ok(Self {
            config,
            manager,
            proxy: Arc::new(EventNotificationProxy::new()),
            tap_detector,
            screen_monitor,
            pump: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        })
    }

    /// Configuration the runtime was built with.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The engine instance manager.
    pub fn manager(&self) -> &Arc<EngineInstanceManager> {
        &self.manager
    }

    /// The notification proxy engine-side listeners subscribe to.
    pub fn proxy(&self) -> &Arc<EventNotificationProxy> {
        &self.proxy
    }

    /// The shared multi-tap detector.
    pub fn tap_detector(&self) -> &Arc<TapGestureDetector> {
        &self.tap_detector
    }

    /// The screen power monitor.
    pub fn screen_monitor(&self) -> &Arc<ScreenStateMonitor> {
        &self.screen_monitor
    }

    /// Spawn the periodic dispatch pump on the current tokio runtime.
    ///
    /// Starting an already running pump is a no-op.
    pub fn start_pump(&self) -> Result<()> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Err(HostError::Other("runtime has been torn down".into()));
        }
        let mut pump = self.pump.lock();
        if pump.as_ref().is_some_and(|p| !p.join.is_finished()) {
            return Ok(());
        }

        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| HostError::RuntimeUnavailable)?;
        let token = CancellationToken::new();
        let join = handle.spawn(run_dispatch_pump(
            Arc::clone(&self.proxy),
            self.config.pump_interval(),
            token.clone(),
        ));
        *pump = Some(PumpTask { token, join });
        Ok(())
    }

    /// Whether a dispatch pump is currently running.
    pub fn is_pump_running(&self) -> bool {
        self.pump
            .lock()
            .as_ref()
            .is_some_and(|p| !p.token.is_cancelled() && !p.join.is_finished())
    }

    /// Cancel the pump and wait for its final flush. Returns the number of
    /// events it dispatched, or `None` if no pump was running.
    pub async fn stop_pump(&self) -> Option<usize> {
        let task = self.pump.lock().take()?;
        task.token.cancel();
        match task.join.await {
            Ok(dispatched) => Some(dispatched),
            Err(e) => {
                warn!("Dispatch pump ended abnormally: {}", e);
                None
            }
        }
    }

    /// Stop the pump and, if no handles remain, shut the engine down.
    ///
    /// Returns whether the engine was shut down. Calling this more than once
    /// has no further effect.
    pub fn teardown(&self) -> bool {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            debug!("Host runtime already torn down");
            return false;
        }

        if let Some(task) = self.pump.lock().take() {
            task.token.cancel();
        }

        let registered = self.manager.coordinator().registered_count();
        match self.manager.instance() {
            Some(instance) if registered == 0 => {
                info!("No session handles remain, shutting engine down");
                instance.quit();
                true
            }
            Some(_) => {
                debug!("{} session handles still registered, leaving engine running", registered);
                false
            }
            None => false,
        }
    }

    /// Whether [`teardown`](Self::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

impl Drop for HostRuntime {
    fn drop(&mut self) {
        if let Some(task) = self.pump.get_mut().take() {
            task.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineInstance, EngineOptions, PlatformContext, Surface};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct QuitCounter {
        quits: AtomicUsize,
    }

    impl EngineInstance for QuitCounter {
        fn resume(&self) {}
        fn pause(&self) {}
        fn window_focus_changed(&self, _has_focus: bool) {}
        fn display_changed(&self, _surface: Option<&Surface>) {}
        fn quit(&self) {
            self.quits.fetch_add(1, Ordering::SeqCst);
        }
        fn send_message(&self, _target: &str, _method: &str, _payload: &str) {}
    }

    struct SharedFactory(Arc<QuitCounter>);

    impl EngineFactory for SharedFactory {
        fn version(&self) -> Option<String> {
            Some("2022.3.7f1".into())
        }

        fn create(
            &self,
            _context: &PlatformContext,
            _options: &EngineOptions,
        ) -> Result<Arc<dyn EngineInstance>> {
            Ok(self.0.clone())
        }
    }

    fn runtime() -> (Arc<QuitCounter>, HostRuntime) {
        let engine = Arc::new(QuitCounter::default());
        let runtime = HostRuntime::builder(Arc::new(SharedFactory(engine.clone())))
            .build()
            .unwrap();
        (engine, runtime)
    }

    #[test]
    fn test_config_version_overrides_factory() {
        let config = HostConfig {
            engine_version: Some("5.2.0".into()),
            ..HostConfig::default()
        };
        let runtime = HostRuntime::builder(Arc::new(SharedFactory(Arc::default())))
            .config(config)
            .build()
            .unwrap();
        assert!(!runtime.manager().capabilities().background_construction);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = HostConfig {
            pump_interval_ms: 0,
            ..HostConfig::default()
        };
        let result = HostRuntime::builder(Arc::new(SharedFactory(Arc::default())))
            .config(config)
            .build();
        assert!(matches!(result, Err(HostError::InvalidArgument { .. })));
    }

    #[test]
    fn test_teardown_quits_when_no_handles_remain() {
        let (engine, runtime) = runtime();
        runtime
            .manager()
            .create_directly(&PlatformContext::foreground("main"))
            .unwrap();

        assert!(runtime.teardown());
        assert!(!runtime.teardown());
        assert_eq!(engine.quits.load(Ordering::SeqCst), 1);
        assert!(runtime.is_torn_down());
    }

    #[test]
    fn test_teardown_keeps_engine_with_registered_handles() {
        let (engine, runtime) = runtime();
        runtime
            .manager()
            .create_directly(&PlatformContext::foreground("main"))
            .unwrap();
        let handle = runtime.manager().create_handle();
        handle.on_visibility_changed(false, None);

        assert!(!runtime.teardown());
        assert_eq!(engine.quits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_teardown_without_instance() {
        let (_engine, runtime) = runtime();
        assert!(!runtime.teardown());
    }

    #[test]
    fn test_start_pump_outside_runtime_fails() {
        let (_engine, runtime) = runtime();
        assert!(matches!(
            runtime.start_pump(),
            Err(HostError::RuntimeUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_pump_lifecycle() {
        let (_engine, runtime) = runtime();
        runtime.start_pump().unwrap();
        assert!(runtime.is_pump_running());
        runtime.start_pump().unwrap();

        runtime.proxy().visibility_changed(true);
        let dispatched = runtime.stop_pump().await;
        assert_eq!(dispatched, Some(1));
        assert!(!runtime.is_pump_running());
        assert_eq!(runtime.stop_pump().await, None);
    }
}
