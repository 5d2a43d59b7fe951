//! Engine collaborator surface.
//!
//! The engine itself is opaque: hostlink only decides when it is created,
//! resumed, paused and which surface it renders into. Everything that
//! actually talks to the embedded runtime sits behind [`EngineInstance`],
//! [`EngineFactory`] and [`CreationRelay`].

mod handle;
mod options;
mod traits;
mod version;

pub use handle::EngineHandle;
pub use options::{ContextConfigurator, EngineOptions};
pub use traits::{
    ContextKind, CreateCallback, CreationRelay, EngineFactory, EngineInstance, PlatformContext,
    Surface,
};
pub use version::{EngineCapabilities, EngineVersion};
