//! Builder for configuring a [`HostRuntime`].

use std::sync::Arc;

use tracing::debug;

use crate::config::HostConfig;
use crate::engine::{CreationRelay, EngineCapabilities, EngineFactory, EngineOptions};
use crate::error::Result;
use crate::runtime::HostRuntime;

/// Builder for [`HostRuntime`].
///
/// # Example
///
/// ```rust,ignore
/// let runtime = HostRuntime::builder(Arc::new(MyEngineFactory))
///     .relay(Arc::new(MyForegroundRelay))
///     .options(EngineOptions::new().detach_from_host(true))
///     .config(HostConfig::load("hostlink.json")?)
///     .build()?;
/// ```
pub struct HostRuntimeBuilder {
    factory: Arc<dyn EngineFactory>,
    relay: Option<Arc<dyn CreationRelay>>,
    options: EngineOptions,
    config: HostConfig,
}

impl HostRuntimeBuilder {
    /// Start a builder around `factory` with default options and config.
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            relay: None,
            options: EngineOptions::default(),
            config: HostConfig::default(),
        }
    }

    /// Relay used when a background context cannot construct the engine.
    ///
    /// Default: none (such requests fail).
    pub fn relay(mut self, relay: Arc<dyn CreationRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Options handed to the factory when the engine is constructed.
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Runtime configuration. `engine_version`, when set, takes precedence
    /// over the version reported by the factory.
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and assemble the runtime.
    pub fn build(self) -> Result<HostRuntime> {
        self.config.validate()?;

        let version = self
            .config
            .engine_version
            .clone()
            .or_else(|| self.factory.version());
        let capabilities = EngineCapabilities::for_version(version.as_deref());
        debug!(
            "Building host runtime for engine {} (background construction: {})",
            capabilities.version, capabilities.background_construction
        );

        let mut manager = crate::instance::EngineInstanceManager::new(self.factory)
            .with_options(self.options)
            .with_capabilities(capabilities);
        if let Some(relay) = self.relay {
            manager = manager.with_relay(relay);
        }

        HostRuntime::assemble(Arc::new(manager), self.config)
    }
}
