//! Visibility leases and the coordinator that turns them into engine
//! resume/pause transitions.

mod coordinator;
mod handle;

pub use coordinator::EngineSessionCoordinator;
pub use handle::{HandleId, SessionHandle};
