//! Centralized configuration for hostlink.
//!
//! Constant groups live on unit structs; runtime-tunable values are grouped in
//! [`HostConfig`], which can be deserialized from JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HostError, Result};

/// Multi-tap recognition defaults and bounds.
pub struct TapConfig;

impl TapConfig {
    pub const DEFAULT_THRESHOLD: u32 = 3;
    pub const DEFAULT_MAX_INTERVAL_MS: u64 = 250;
    pub const DEFAULT_ZONE_RADIUS_RELATIVE: f32 = 0.15;
    pub const MIN_ZONE_RADIUS_RELATIVE: f32 = 0.01;
    pub const MAX_ZONE_RADIUS_RELATIVE: f32 = 1.0;
}

/// Event pump timing.
pub struct DispatchConfig;

impl DispatchConfig {
    /// Roughly one frame at 60 Hz.
    pub const PUMP_INTERVAL: Duration = Duration::from_millis(16);
}

/// Engine version handling.
pub struct EngineConfig;

impl EngineConfig {
    /// Assumed when the embedding host does not report an engine version.
    pub const FALLBACK_VERSION: &'static str = "5.1.3";
    /// First engine release that can be constructed from a background context.
    pub const BACKGROUND_CONSTRUCTION_MIN_VERSION: &'static str = "5.3.6";
}

/// Tap detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapSettings {
    pub threshold: u32,
    pub max_interval_ms: u64,
    pub zone_radius_relative: f32,
}

impl Default for TapSettings {
    fn default() -> Self {
        Self {
            threshold: TapConfig::DEFAULT_THRESHOLD,
            max_interval_ms: TapConfig::DEFAULT_MAX_INTERVAL_MS,
            zone_radius_relative: TapConfig::DEFAULT_ZONE_RADIUS_RELATIVE,
        }
    }
}

impl TapSettings {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.threshold < 1 {
            return Err(HostError::invalid("tap.threshold", "must be >= 1"));
        }
        if self.max_interval_ms == 0 {
            return Err(HostError::invalid("tap.max_interval_ms", "must be positive"));
        }
        let radius = self.zone_radius_relative;
        if !(TapConfig::MIN_ZONE_RADIUS_RELATIVE..=TapConfig::MAX_ZONE_RADIUS_RELATIVE)
            .contains(&radius)
        {
            return Err(HostError::invalid(
                "tap.zone_radius_relative",
                "must be in range [0.01, 1]",
            ));
        }
        Ok(())
    }
}

/// Runtime configuration for a [`crate::HostRuntime`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub tap: TapSettings,
    pub pump_interval_ms: u64,
    /// Version reported by the embedded engine, if known.
    pub engine_version: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tap: TapSettings::default(),
            pump_interval_ms: DispatchConfig::PUMP_INTERVAL.as_millis() as u64,
            engine_version: None,
        }
    }
}

impl HostConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: HostConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| HostError::io_with_path(e, path))?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.tap.validate()?;
        if self.pump_interval_ms == 0 {
            return Err(HostError::invalid("pump_interval_ms", "must be positive"));
        }
        Ok(())
    }

    /// Dispatch pump period.
    pub fn pump_interval(&self) -> Duration {
        Duration::from_millis(self.pump_interval_ms)
    }
}
