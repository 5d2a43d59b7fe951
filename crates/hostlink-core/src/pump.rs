//! Periodic event dispatch.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::events::EventNotificationProxy;

/// Call [`EventNotificationProxy::dispatch_all`] every `period` until
/// `token` is cancelled, then flush once more.
///
/// Returns the total number of events dispatched.
pub async fn run_dispatch_pump(
    proxy: Arc<EventNotificationProxy>,
    period: Duration,
    token: CancellationToken,
) -> usize {
    debug!("Dispatch pump started ({:?} period)", period);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut dispatched = 0;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                dispatched += proxy.dispatch_all();
            }
        }
    }

    dispatched += proxy.dispatch_all();
    debug!("Dispatch pump stopped after {} events", dispatched);
    dispatched
}
