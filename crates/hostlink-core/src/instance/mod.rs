//! Engine instance ownership and the instantiate-or-join protocol.

mod manager;
mod notifier;
mod request;

pub use manager::EngineInstanceManager;
pub use notifier::{InstanceCreatedCallback, OneShotNotifier};
pub use request::{InstantiationHooks, InstantiationRequest, RequestState};
