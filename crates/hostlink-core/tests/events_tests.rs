//! Integration tests for event delivery from consumers to engine listeners.

use std::sync::Arc;
use std::time::Duration;

use hostlink::{
    DesiredSize, EngineEventsListener, EngineFactory, EngineInstance, EngineOptions,
    EventNotificationProxy, HostConfig, HostRuntime, LiveSurfaceSession, Offsets,
    PlatformContext, Result, Surface, TapPosition,
};
use parking_lot::Mutex;

struct SilentEngine;

impl EngineInstance for SilentEngine {
    fn resume(&self) {}
    fn pause(&self) {}
    fn window_focus_changed(&self, _has_focus: bool) {}
    fn display_changed(&self, _surface: Option<&Surface>) {}
    fn quit(&self) {}
    fn send_message(&self, _target: &str, _method: &str, _payload: &str) {}
}

struct SilentFactory;

impl EngineFactory for SilentFactory {
    fn version(&self) -> Option<String> {
        Some("2022.3.7f1".to_string())
    }

    fn create(
        &self,
        _context: &PlatformContext,
        _options: &EngineOptions,
    ) -> Result<Arc<dyn EngineInstance>> {
        Ok(Arc::new(SilentEngine))
    }
}

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock())
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl EngineEventsListener for EventLog {
    fn visibility_changed(&self, visible: bool) {
        self.push(format!("visibility:{visible}"));
    }
    fn offsets_changed(&self, offsets: Offsets) {
        self.push(format!("offsets:{}", offsets.x_offset));
    }
    fn preview_changed(&self, is_preview: bool) {
        self.push(format!("preview:{is_preview}"));
    }
    fn desired_size_changed(&self, size: DesiredSize) {
        self.push(format!("size:{}x{}", size.width, size.height));
    }
    fn multi_tap_detected(&self, position: TapPosition) {
        self.push(format!("tap:{},{}", position.x, position.y));
    }
    fn custom_event_received(&self, name: &str, data: &str) {
        self.push(format!("custom:{name}={data}"));
    }
}

struct PanickingListener;

impl EngineEventsListener for PanickingListener {
    fn visibility_changed(&self, _visible: bool) {
        panic!("listener failure");
    }
}

fn runtime_with_log() -> (HostRuntime, Arc<EventLog>) {
    let runtime = HostRuntime::builder(Arc::new(SilentFactory)).build().unwrap();
    let log = Arc::new(EventLog::default());
    runtime.proxy().register_listener(log.clone());
    (runtime, log)
}

#[test]
fn test_visible_session_announces_state() {
    let (runtime, log) = runtime_with_log();
    let session =
        LiveSurfaceSession::start(&runtime, PlatformContext::background("preview"), true).unwrap();

    session.on_desired_size_changed(1080, 1920);
    session.on_surface_created(Surface::new(1, 1080, 1920));
    session.on_visibility_changed(true);

    runtime.proxy().dispatch_all();
    assert_eq!(
        log.take(),
        vec!["visibility:true", "preview:true", "size:1080x1920"]
    );

    session.on_visibility_changed(false);
    runtime.proxy().dispatch_all();
    assert_eq!(log.take(), vec!["visibility:false"]);
}

#[test]
fn test_offsets_coalesce_to_latest() {
    let (runtime, log) = runtime_with_log();
    let session =
        LiveSurfaceSession::start(&runtime, PlatformContext::background("wallpaper"), false)
            .unwrap();

    for step in 0..4 {
        session.on_offsets_changed(Offsets {
            x_offset: step as f32 * 0.25,
            ..Offsets::default()
        });
    }
    runtime.proxy().dispatch_all();
    assert_eq!(log.take(), vec!["offsets:0.75"]);
}

#[test]
fn test_multi_tap_reaches_listeners_while_visible() {
    let (runtime, log) = runtime_with_log();
    let session =
        LiveSurfaceSession::start(&runtime, PlatformContext::background("wallpaper"), false)
            .unwrap();
    session.on_desired_size_changed(1000, 2000);
    session.on_visibility_changed(true);
    runtime.proxy().dispatch_all();
    log.take();

    assert!(!session.on_touch_down(0, 100.0, 100.0));
    assert!(!session.on_touch_down(100, 105.0, 98.0));
    assert!(session.on_touch_down(200, 102.0, 101.0));
    runtime.proxy().dispatch_all();
    assert_eq!(log.take(), vec!["tap:102,101"]);

    // Hidden surfaces stop feeding the proxy.
    session.on_visibility_changed(false);
    runtime.proxy().dispatch_all();
    log.take();
    for t in [1000, 1100, 1200] {
        session.on_touch_down(t, 100.0, 100.0);
    }
    runtime.proxy().dispatch_all();
    assert!(log.take().is_empty());
}

#[test]
fn test_panicking_listener_does_not_block_others() {
    let proxy = EventNotificationProxy::new();
    let log = Arc::new(EventLog::default());
    proxy.register_listener(Arc::new(PanickingListener));
    proxy.register_listener(log.clone());

    proxy.visibility_changed(true);
    proxy.custom_event_received("weather", "rain");
    assert_eq!(proxy.dispatch_all(), 2);
    assert_eq!(log.take(), vec!["visibility:true", "custom:weather=rain"]);
}

#[tokio::test(start_paused = true)]
async fn test_pump_delivers_queued_events() {
    let (runtime, log) = runtime_with_log();
    runtime.start_pump().unwrap();
    assert!(runtime.is_pump_running());

    runtime.proxy().custom_event_received("score", "10");
    runtime.proxy().custom_event_received("score", "10");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(log.take(), vec!["custom:score=10", "custom:score=10"]);

    runtime.proxy().visibility_changed(true);
    let dispatched = runtime.stop_pump().await.unwrap();
    assert_eq!(dispatched, 3);
    assert_eq!(log.take(), vec!["visibility:true"]);
    assert!(!runtime.is_pump_running());
}

#[test]
fn test_start_pump_outside_runtime_fails() {
    let (runtime, _log) = runtime_with_log();
    assert!(runtime.start_pump().is_err());
}

#[test]
fn test_config_tunes_tap_detector() {
    let config = HostConfig::from_json_str(r#"{ "tap": { "threshold": 2 } }"#).unwrap();
    let runtime = HostRuntime::builder(Arc::new(SilentFactory))
        .config(config)
        .build()
        .unwrap();
    let detector = runtime.tap_detector();
    assert_eq!(detector.threshold(), 2);
    detector.set_screen_size(1000, 1000);
    assert!(!detector.on_tap_down(0, 10.0, 10.0));
    assert!(detector.on_tap_down(50, 10.0, 10.0));
}
