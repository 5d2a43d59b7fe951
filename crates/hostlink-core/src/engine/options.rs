//! Construction options passed to the engine factory.

use std::fmt;
use std::sync::Arc;

use crate::engine::traits::PlatformContext;

/// Callback that rebinds the engine's internal host context.
///
/// Receives the context the engine should treat as its host from now on.
pub type ContextConfigurator = Arc<dyn Fn(&PlatformContext) + Send + Sync + 'static>;

/// Options the [`crate::EngineFactory`] honors when constructing the engine.
#[derive(Clone, Default)]
pub struct EngineOptions {
    /// Detach the engine from the context that constructed it, so it keeps
    /// running after that context goes away.
    pub detach_from_host: bool,
    /// Rebinds the engine's host context after construction.
    pub context_configurator: Option<ContextConfigurator>,
}

impl EngineOptions {
    /// Default options: attached to the host, no context configurator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the factory to construct the engine detached from its host window.
    pub fn detach_from_host(mut self, detach: bool) -> Self {
        self.detach_from_host = detach;
        self
    }

    /// Install the callback used to rebind the engine's host context.
    pub fn with_context_configurator<F>(mut self, configurator: F) -> Self
    where
        F: Fn(&PlatformContext) + Send + Sync + 'static,
    {
        self.context_configurator = Some(Arc::new(configurator));
        self
    }
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("detach_from_host", &self.detach_from_host)
            .field("context_configurator", &self.context_configurator.is_some())
            .finish()
    }
}
