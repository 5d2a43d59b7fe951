//! Engine collaborator traits.

use std::fmt;
use std::sync::Arc;

use crate::engine::options::EngineOptions;
use crate::error::Result;

/// A drawable target the engine can render into.
///
/// Surfaces are compared by `id` only; width and height are informational.
#[derive(Debug, Clone, Copy)]
pub struct Surface {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

impl Surface {
    /// Surface `id` with the given size.
    pub fn new(id: u64, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Surface {}

/// Where a platform context comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// A foreground, user-facing context (screen). Always usable for construction.
    Foreground,
    /// A background context (service, embedded view host). Usable for
    /// construction only on engine versions that support it.
    Background,
}

/// Host context handed to the engine factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformContext {
    pub label: String,
    pub kind: ContextKind,
}

impl PlatformContext {
    /// A foreground context, always able to construct the engine.
    pub fn foreground(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ContextKind::Foreground,
        }
    }

    /// A background context, which older engines cannot construct from.
    pub fn background(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ContextKind::Background,
        }
    }

    /// Whether this is a foreground context.
    pub fn is_foreground(&self) -> bool {
        self.kind == ContextKind::Foreground
    }
}

impl fmt::Display for PlatformContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ContextKind::Foreground => write!(f, "{} (foreground)", self.label),
            ContextKind::Background => write!(f, "{} (background)", self.label),
        }
    }
}

/// The embedded engine instance.
///
/// Implementations must not call back into the session coordinator from
/// `resume`/`pause`/`display_changed`: those are invoked while the
/// coordinator holds its lock.
pub trait EngineInstance: Send + Sync {
    /// Resume the engine main loop.
    fn resume(&self);

    /// Suspend the engine main loop.
    fn pause(&self);

    /// The window containing the engine gained or lost focus.
    fn window_focus_changed(&self, has_focus: bool);

    /// Attach a new primary surface, or detach it with `None`.
    fn display_changed(&self, surface: Option<&Surface>);

    /// Shut the engine down for good.
    fn quit(&self);

    /// Deliver a message to a named receiver inside the engine.
    fn send_message(&self, target: &str, method: &str, payload: &str);
}

/// Constructs the engine instance.
///
/// hostlink guarantees `create` is called at most once per manager.
pub trait EngineFactory: Send + Sync {
    /// Version string of the engine this factory produces.
    fn version(&self) -> Option<String> {
        None
    }

    /// Construct the engine using `context`, honoring `options`.
    fn create(
        &self,
        context: &PlatformContext,
        options: &EngineOptions,
    ) -> Result<Arc<dyn EngineInstance>>;
}

/// Callback a [`CreationRelay`] invokes once it has obtained a context that
/// can construct the engine.
pub type CreateCallback = Box<dyn FnOnce(PlatformContext) -> Result<()> + Send + 'static>;

/// Indirection used when the requesting context cannot construct the engine
/// itself (for example, by launching a short-lived foreground screen).
pub trait CreationRelay: Send + Sync {
    /// Arrange for `create` to be called later with a construction-capable
    /// context. `requested_by` is the context that asked for the instance.
    fn schedule(&self, requested_by: PlatformContext, create: CreateCallback);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_identity_ignores_size() {
        assert_eq!(Surface::new(1, 100, 200), Surface::new(1, 300, 400));
        assert_ne!(Surface::new(1, 100, 200), Surface::new(2, 100, 200));
    }

    #[test]
    fn test_context_display() {
        assert_eq!(
            PlatformContext::background("wallpaper").to_string(),
            "wallpaper (background)"
        );
        assert!(PlatformContext::foreground("main").is_foreground());
    }
}
