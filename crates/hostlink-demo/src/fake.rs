//! Stand-ins for a real embedded engine and its host.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hostlink::{
    CreateCallback, CreationRelay, DesiredSize, EngineEventsListener, EngineFactory,
    EngineInstance, EngineOptions, Offsets, PlatformContext, Surface, TapPosition,
};
use tracing::{info, warn};

/// Engine that only logs what it is asked to do.
pub struct LoggingEngine {
    name: String,
}

impl EngineInstance for LoggingEngine {
    fn resume(&self) {
        info!("[{}] resume", self.name);
    }

    fn pause(&self) {
        info!("[{}] pause", self.name);
    }

    fn window_focus_changed(&self, has_focus: bool) {
        info!("[{}] focus={}", self.name, has_focus);
    }

    fn display_changed(&self, surface: Option<&Surface>) {
        match surface {
            Some(s) => info!("[{}] display -> surface {} ({}x{})", self.name, s.id, s.width, s.height),
            None => info!("[{}] display detached", self.name),
        }
    }

    fn quit(&self) {
        info!("[{}] quit", self.name);
    }

    fn send_message(&self, target: &str, method: &str, payload: &str) {
        info!("[{}] {}.{}({})", self.name, target, method, payload);
    }
}

pub struct LoggingFactory {
    version: String,
    created: AtomicUsize,
}

impl LoggingFactory {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl EngineFactory for LoggingFactory {
    fn version(&self) -> Option<String> {
        Some(self.version.clone())
    }

    fn create(
        &self,
        context: &PlatformContext,
        options: &EngineOptions,
    ) -> hostlink::Result<Arc<dyn EngineInstance>> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Constructing engine #{} from {} (detach_from_host: {})",
            n, context, options.detach_from_host
        );
        Ok(Arc::new(LoggingEngine {
            name: format!("engine#{n}"),
        }))
    }
}

/// Simulates launching a short-lived foreground screen to build the engine.
pub struct ForegroundRelay {
    pub launch_delay: Duration,
}

impl CreationRelay for ForegroundRelay {
    fn schedule(&self, requested_by: PlatformContext, create: CreateCallback) {
        info!("{} cannot build the engine, launching a foreground screen", requested_by);
        let delay = self.launch_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = create(PlatformContext::foreground("relay-screen")) {
                warn!("Relayed engine construction failed: {}", e);
            }
        });
    }
}

/// Engine-side script receiving host notifications.
pub struct LoggingListener;

impl EngineEventsListener for LoggingListener {
    fn visibility_changed(&self, visible: bool) {
        info!("listener: visibility_changed({})", visible);
    }

    fn offsets_changed(&self, offsets: Offsets) {
        info!(
            "listener: offsets_changed(x: {:.2}, step: {:.2}, px: {})",
            offsets.x_offset, offsets.x_offset_step, offsets.x_pixel_offset
        );
    }

    fn preview_changed(&self, is_preview: bool) {
        info!("listener: preview_changed({})", is_preview);
    }

    fn desired_size_changed(&self, size: DesiredSize) {
        info!("listener: desired_size_changed({}x{})", size.width, size.height);
    }

    fn preference_changed(&self, key: &str) {
        info!("listener: preference_changed({})", key);
    }

    fn preferences_activity_triggered(&self) {
        info!("listener: preferences_activity_triggered");
    }

    fn multi_tap_detected(&self, position: TapPosition) {
        info!("listener: multi_tap_detected({:.0}, {:.0})", position.x, position.y);
    }

    fn custom_event_received(&self, name: &str, data: &str) {
        info!("listener: custom_event_received({}, {})", name, data);
    }
}
