//! Managed access to the engine instance.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::engine::options::{ContextConfigurator, EngineOptions};
use crate::engine::traits::{EngineInstance, PlatformContext, Surface};

/// The single engine instance, as owned by the instance manager.
///
/// Adds surface bookkeeping and focus handling on top of the raw
/// [`EngineInstance`].
pub struct EngineHandle {
    instance: Arc<dyn EngineInstance>,
    /// Context the engine was constructed with.
    construction_context: PlatformContext,
    configurator: Option<ContextConfigurator>,
    /// Surface most recently attached, if any.
    current_surface: Mutex<Option<Surface>>,
}

impl EngineHandle {
    pub(crate) fn new(
        instance: Arc<dyn EngineInstance>,
        construction_context: PlatformContext,
        options: &EngineOptions,
    ) -> Self {
        Self {
            instance,
            construction_context,
            configurator: options.context_configurator.clone(),
            current_surface: Mutex::new(None),
        }
    }

    /// Resume the engine, then give it window focus.
    pub fn resume(&self) {
        debug!("Resuming engine");
        self.instance.resume();
        self.instance.window_focus_changed(true);
    }

    /// Take window focus away, then pause the engine.
    pub fn pause(&self) {
        debug!("Pausing engine");
        self.instance.window_focus_changed(false);
        self.instance.pause();
    }

    /// Attach `surface` as the primary render target, or detach with `None`.
    pub fn set_surface(&self, surface: Option<Surface>) {
        match &surface {
            Some(s) => trace!("Updating engine surface (w: {}, h: {})", s.width, s.height),
            None => trace!("Detaching engine surface"),
        }
        let mut current = self.current_surface.lock();
        *current = surface;
        self.instance.display_changed(current.as_ref());
    }

    /// Handle destruction of `surface`. Only the surface currently in use is
    /// detached; destruction of any other surface is ignored.
    pub fn handle_surface_destroyed(&self, surface: &Surface) -> bool {
        let mut current = self.current_surface.lock();
        if current.as_ref() != Some(surface) {
            return false;
        }
        trace!(
            "Handling destruction of current surface (w: {}, h: {})",
            surface.width,
            surface.height
        );
        *current = None;
        self.instance.display_changed(None);
        true
    }

    /// Surface currently attached, if any.
    pub fn current_surface(&self) -> Option<Surface> {
        *self.current_surface.lock()
    }

    /// Rebind the engine's host context. `None` restores the construction
    /// context. No-op when no configurator was supplied.
    pub fn set_context(&self, context: Option<&PlatformContext>) {
        let Some(configurator) = &self.configurator else {
            return;
        };
        configurator(context.unwrap_or(&self.construction_context));
    }

    /// Context the engine was constructed with.
    pub fn construction_context(&self) -> &PlatformContext {
        &self.construction_context
    }

    /// Send `payload` to `method` on the engine-side `target`.
    pub fn send_message(&self, target: &str, method: &str, payload: &str) {
        self.instance.send_message(target, method, payload);
    }

    /// Shut the engine down. The instance is never recreated afterwards.
    pub fn quit(&self) {
        debug!("Shutting down engine");
        self.instance.quit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    #[derive(Default)]
    struct Recorder {
        calls: PlMutex<Vec<String>>,
    }

    impl EngineInstance for Recorder {
        fn resume(&self) {
            self.calls.lock().push("resume".into());
        }
        fn pause(&self) {
            self.calls.lock().push("pause".into());
        }
        fn window_focus_changed(&self, has_focus: bool) {
            self.calls.lock().push(format!("focus:{has_focus}"));
        }
        fn display_changed(&self, surface: Option<&Surface>) {
            let id = surface.map(|s| s.id.to_string()).unwrap_or_else(|| "none".into());
            self.calls.lock().push(format!("display:{id}"));
        }
        fn quit(&self) {
            self.calls.lock().push("quit".into());
        }
        fn send_message(&self, target: &str, method: &str, payload: &str) {
            self.calls.lock().push(format!("msg:{target}.{method}({payload})"));
        }
    }

    fn handle_with(options: &EngineOptions) -> (Arc<Recorder>, EngineHandle) {
        let recorder = Arc::new(Recorder::default());
        let handle = EngineHandle::new(
            recorder.clone(),
            PlatformContext::foreground("main"),
            options,
        );
        (recorder, handle)
    }

    #[test]
    fn test_resume_pause_focus_order() {
        let (recorder, handle) = handle_with(&EngineOptions::default());
        handle.resume();
        handle.pause();
        assert_eq!(
            *recorder.calls.lock(),
            vec!["resume", "focus:true", "focus:false", "pause"]
        );
    }

    #[test]
    fn test_only_current_surface_is_detached() {
        let (recorder, handle) = handle_with(&EngineOptions::default());
        handle.set_surface(Some(Surface::new(1, 10, 10)));
        assert!(!handle.handle_surface_destroyed(&Surface::new(2, 10, 10)));
        assert_eq!(handle.current_surface(), Some(Surface::new(1, 10, 10)));

        assert!(handle.handle_surface_destroyed(&Surface::new(1, 10, 10)));
        assert_eq!(handle.current_surface(), None);
        assert_eq!(*recorder.calls.lock(), vec!["display:1", "display:none"]);
    }

    #[test]
    fn test_set_context_uses_configurator() {
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = seen.clone();
        let options = EngineOptions::new().with_context_configurator(move |ctx| {
            sink.lock().push(ctx.label.clone());
        });
        let (_, handle) = handle_with(&options);

        handle.set_context(Some(&PlatformContext::background("service")));
        handle.set_context(None);
        assert_eq!(
            *seen.lock(),
            vec!["service".to_string(), "main".to_string()]
        );
    }

    #[test]
    fn test_set_context_without_configurator_is_noop() {
        let (recorder, handle) = handle_with(&EngineOptions::default());
        handle.set_context(None);
        assert!(recorder.calls.lock().is_empty());
    }
}
