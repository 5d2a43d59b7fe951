//! Multi-tap recognition.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::config::{TapConfig, TapSettings};
use crate::error::{HostError, Result};
use crate::events::ListenerSet;

/// Notified with the position of the final tap of a recognized multi-tap.
pub trait MultiTapListener: Send + Sync {
    fn on_multi_tap(&self, x: f32, y: f32);
}

impl<F> MultiTapListener for F
where
    F: Fn(f32, f32) + Send + Sync,
{
    fn on_multi_tap(&self, x: f32, y: f32) {
        self(x, y)
    }
}

struct TapState {
    threshold: u32,
    max_interval_ms: u64,
    zone_radius_relative: f32,
    zone_radius_absolute: f32,
    screen_width: u32,
    screen_height: u32,
    last_tap_ms: u64,
    last_x: f32,
    last_y: f32,
    count: u32,
}

impl TapState {
    fn update_radius(&mut self) {
        self.zone_radius_absolute = (self.screen_width as f32 + self.screen_height as f32)
            * 0.5
            * self.zone_radius_relative;
    }
}

/// Recognizes N taps in quick succession within a small zone.
///
/// The tap zone radius is relative to the average of the screen's width and
/// height, so [`set_screen_size`](Self::set_screen_size) must be called
/// before taps can chain.
pub struct TapGestureDetector {
    state: Mutex<TapState>,
    listeners: ListenerSet<dyn MultiTapListener>,
}

impl TapGestureDetector {
    /// Create a detector, validating `settings`.
    pub fn new(settings: &TapSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::from_valid(settings))
    }

    fn from_valid(settings: &TapSettings) -> Self {
        Self {
            state: Mutex::new(TapState {
                threshold: settings.threshold,
                max_interval_ms: settings.max_interval_ms,
                zone_radius_relative: settings.zone_radius_relative,
                zone_radius_absolute: 0.0,
                screen_width: 0,
                screen_height: 0,
                last_tap_ms: 0,
                last_x: 0.0,
                last_y: 0.0,
                count: 0,
            }),
            listeners: ListenerSet::new(),
        }
    }

    /// Feed a tap-down at `t_ms` (monotonic milliseconds) and `(x, y)`.
    ///
    /// Returns `true` if this tap completed a multi-tap; listeners have been
    /// notified by then.
    pub fn on_tap_down(&self, t_ms: u64, x: f32, y: f32) -> bool {
        let fired = {
            let mut state = self.state.lock();
            if state.count > 0 {
                let elapsed = t_ms.saturating_sub(state.last_tap_ms);
                let distance = (state.last_x - x).hypot(state.last_y - y);
                if elapsed > state.max_interval_ms || distance > state.zone_radius_absolute {
                    state.count = 0;
                }
            }

            state.last_tap_ms = t_ms;
            state.last_x = x;
            state.last_y = y;
            state.count += 1;

            if state.count >= state.threshold {
                state.count = 0;
                true
            } else {
                false
            }
        };

        if fired {
            trace!("Multi-tap detected at ({}, {})", x, y);
            self.listeners
                .notify("multi_tap", |l| l.on_multi_tap(x, y));
        }
        fired
    }

    /// Set the screen size the tap zone radius is derived from.
    pub fn set_screen_size(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        state.screen_width = width;
        state.screen_height = height;
        state.update_radius();
    }

    /// Number of taps that make a multi-tap. Must be at least 1.
    pub fn set_threshold(&self, threshold: u32) -> Result<()> {
        if threshold < 1 {
            return Err(HostError::invalid("threshold", "must be >= 1"));
        }
        self.state.lock().threshold = threshold;
        Ok(())
    }

    /// Longest gap between chained taps. Must be positive.
    pub fn set_max_interval_ms(&self, max_interval_ms: u64) -> Result<()> {
        if max_interval_ms == 0 {
            return Err(HostError::invalid("max_interval_ms", "must be positive"));
        }
        self.state.lock().max_interval_ms = max_interval_ms;
        Ok(())
    }

    /// Tap zone radius relative to the screen size, in `[0.01, 1]`.
    pub fn set_zone_radius_relative(&self, relative: f32) -> Result<()> {
        if !(TapConfig::MIN_ZONE_RADIUS_RELATIVE..=TapConfig::MAX_ZONE_RADIUS_RELATIVE)
            .contains(&relative)
        {
            return Err(HostError::invalid(
                "zone_radius_relative",
                "must be in range [0.01, 1]",
            ));
        }
        let mut state = self.state.lock();
        state.zone_radius_relative = relative;
        state.update_radius();
        Ok(())
    }

    /// Taps needed for a multi-tap.
    pub fn threshold(&self) -> u32 {
        self.state.lock().threshold
    }

    /// Longest gap between chained taps, in milliseconds.
    pub fn max_interval_ms(&self) -> u64 {
        self.state.lock().max_interval_ms
    }

    /// Tap zone radius relative to the screen size.
    pub fn zone_radius_relative(&self) -> f32 {
        self.state.lock().zone_radius_relative
    }

    /// Tap zone radius in screen units.
    pub fn zone_radius_absolute(&self) -> f32 {
        self.state.lock().zone_radius_absolute
    }

    /// Taps counted towards the current sequence.
    pub fn pending_taps(&self) -> u32 {
        self.state.lock().count
    }

    /// Add `listener`. Returns false if it was already registered.
    pub fn register_listener(&self, listener: Arc<dyn MultiTapListener>) -> bool {
        self.listeners.register(listener)
    }

    /// Remove `listener`. Returns false if it was not registered.
    pub fn unregister_listener(&self, listener: &Arc<dyn MultiTapListener>) -> bool {
        self.listeners.unregister(listener)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for TapGestureDetector {
    fn default() -> Self {
        Self::from_valid(&TapSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn detector_with_counter() -> (TapGestureDetector, Arc<AtomicUsize>) {
        let detector = TapGestureDetector::default();
        detector.set_screen_size(1000, 1000);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        detector.register_listener(Arc::new(move |_x: f32, _y: f32| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (detector, fired)
    }

    #[test]
    fn test_absolute_radius() {
        let detector = TapGestureDetector::default();
        detector.set_screen_size(1080, 1920);
        assert!((detector.zone_radius_absolute() - 225.0).abs() < 1e-3);
        detector.set_zone_radius_relative(0.5).unwrap();
        assert!((detector.zone_radius_absolute() - 750.0).abs() < 1e-3);
    }

    #[test]
    fn test_three_quick_taps_fire_once() {
        let (detector, fired) = detector_with_counter();
        assert!(!detector.on_tap_down(0, 100.0, 100.0));
        assert!(!detector.on_tap_down(100, 110.0, 100.0));
        assert!(detector.on_tap_down(200, 105.0, 95.0));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(detector.pending_taps(), 0);

        assert!(!detector.on_tap_down(250, 105.0, 95.0));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slow_taps_reset() {
        let (detector, fired) = detector_with_counter();
        detector.on_tap_down(0, 100.0, 100.0);
        detector.on_tap_down(100, 100.0, 100.0);
        detector.on_tap_down(400, 100.0, 100.0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(detector.pending_taps(), 1);
    }

    #[test]
    fn test_distant_taps_reset() {
        let (detector, fired) = detector_with_counter();
        detector.on_tap_down(0, 100.0, 100.0);
        detector.on_tap_down(50, 100.0, 100.0);
        detector.on_tap_down(100, 600.0, 600.0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(detector.pending_taps(), 1);
    }

    #[test]
    fn test_setter_validation() {
        let detector = TapGestureDetector::default();
        assert!(detector.set_threshold(0).unwrap_err().is_misuse());
        assert!(detector.set_max_interval_ms(0).is_err());
        assert!(detector.set_zone_radius_relative(0.0).is_err());
        assert!(detector.set_zone_radius_relative(1.5).is_err());
        detector.set_threshold(2).unwrap();
        assert_eq!(detector.threshold(), 2);
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let settings = TapSettings {
            threshold: 0,
            ..TapSettings::default()
        };
        assert!(TapGestureDetector::new(&settings).is_err());
    }

    #[test]
    fn test_unregistered_listener_is_not_notified() {
        let detector = TapGestureDetector::default();
        detector.set_threshold(1).unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let listener: Arc<dyn MultiTapListener> = Arc::new(move |_x: f32, _y: f32| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        detector.register_listener(listener.clone());
        detector.on_tap_down(0, 0.0, 0.0);
        detector.unregister_listener(&listener);
        detector.on_tap_down(10, 0.0, 0.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
