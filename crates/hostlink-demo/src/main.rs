//! hostlink demo - drives the lifecycle coordinator with a logging engine.
//!
//! Simulates a live wallpaper host: a background surface that needs the
//! engine, a preview of the same wallpaper, taps, scrolling and screen power
//! events. Every call the engine receives is logged.

mod fake;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use hostlink::{
    CachedPreference, DataChangedFlag, HostConfig, HostRuntime, JsonFileStore, KeyValueStore,
    LiveSurfaceSession, MemoryStore, Offsets, PlatformContext, Surface,
};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::fake::{ForegroundRelay, LoggingFactory, LoggingListener};

#[derive(Parser, Debug)]
#[command(name = "hostlink-demo")]
#[command(about = "Simulate consumers sharing one embedded engine")]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// Host configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine version to report (older than 5.3.6 forces the relay path)
    #[arg(long, default_value = "5.1.3")]
    engine_version: String,

    /// Preferences file; an in-memory store is used when omitted
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Pause between simulated host events, in milliseconds
    #[arg(long, default_value = "50")]
    step_ms: u64,

    /// Keep running after the scenario until Ctrl+C
    #[arg(long)]
    wait: bool,
}

fn init_logging(args: &Args) {
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);
    if args.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    let step = Duration::from_millis(args.step_ms);

    let store: Arc<dyn KeyValueStore> = match &args.prefs {
        Some(path) => Arc::new(JsonFileStore::open(path)?),
        None => Arc::new(MemoryStore::new()),
    };
    let launches = CachedPreference::new(store, "launch_count", 0u32);
    let launch_count = launches.get() + 1;
    launches.commit(launch_count)?;
    let data_changed = DataChangedFlag::new();
    data_changed.mark_changed();
    info!("Starting hostlink demo (launch #{})", launch_count);

    let factory = Arc::new(LoggingFactory::new(&args.engine_version));
    let runtime = HostRuntime::builder(factory.clone())
        .relay(Arc::new(ForegroundRelay { launch_delay: step }))
        .config(config)
        .build()?;
    runtime.proxy().register_listener(Arc::new(LoggingListener));
    runtime.start_pump()?;

    // Background surface comes up before the engine exists.
    let wallpaper = LiveSurfaceSession::start(
        &runtime,
        PlatformContext::background("wallpaper"),
        false,
    )?;
    wallpaper.on_surface_created(Surface::new(1, 1080, 2400));
    wallpaper.on_desired_size_changed(1080, 2400);
    wallpaper.on_visibility_changed(true);

    runtime.manager().wait_for_instance().await?;
    info!("Engine ready ({} constructed)", factory.created());
    if data_changed.take_changed() {
        runtime.proxy().preference_changed("launch_count");
    }
    tokio::time::sleep(step).await;

    info!("Scrolling home screen pages");
    for page in 0..=4 {
        wallpaper.on_offsets_changed(Offsets {
            x_offset: page as f32 * 0.25,
            x_offset_step: 0.25,
            x_pixel_offset: -(page * 270),
            ..Offsets::default()
        });
    }
    tokio::time::sleep(step).await;

    info!("Triple tap");
    for (i, t) in [0u64, 120, 240].into_iter().enumerate() {
        wallpaper.on_touch_down(t, 540.0 + i as f32, 1200.0);
    }
    runtime.proxy().custom_event_received("weather", "rain");
    tokio::time::sleep(step).await;

    info!("Opening wallpaper preview");
    let preview =
        LiveSurfaceSession::start(&runtime, PlatformContext::foreground("preview"), true)?;
    preview.on_surface_created(Surface::new(2, 540, 1200));
    preview.on_visibility_changed(true);
    wallpaper.on_visibility_changed(false);
    runtime.proxy().preferences_activity_triggered();
    tokio::time::sleep(step).await;

    info!("Closing wallpaper preview");
    preview.on_visibility_changed(false);
    preview.destroy();
    wallpaper.on_visibility_changed(true);
    tokio::time::sleep(step).await;

    info!("Screen off and on");
    runtime.screen_monitor().on_screen_off();
    tokio::time::sleep(step).await;
    runtime.screen_monitor().on_screen_on();
    tokio::time::sleep(step).await;

    if args.wait {
        info!("Scenario complete, waiting for Ctrl+C");
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
    }

    let last_session = wallpaper.destroy();
    if let Some(dispatched) = runtime.stop_pump().await {
        info!("Pump dispatched {} events", dispatched);
    }
    if last_session && runtime.teardown() {
        info!("Engine shut down");
    }
    Ok(())
}
