//! Event bridge: folds client lifecycle events into the session state.

use crate::client::{AuthEvent, EventSlot};
use crate::state::SessionState;
use std::sync::Weak;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Fold one event into the state.
///
/// Returns the next snapshot for `SessionChanged` / `StatusChanged`, and
/// `None` for event kinds that do not touch the state.
pub fn fold_event<S: Clone>(
    state: &SessionState<S>,
    event: &AuthEvent<S>,
) -> Option<SessionState<S>> {
    match event {
        AuthEvent::SessionChanged { session } => Some(state.with_session(session.clone())),
        AuthEvent::StatusChanged { status } => Some(state.with_status(*status)),
        _ => None,
    }
}

/// Receiver side of the bridge, implemented by the coordinator.
pub(crate) trait EventSink<S>: Send + Sync + 'static {
    /// Apply an event for the given binding epoch.
    ///
    /// Returns false once the epoch is no longer current; the bridge then
    /// stops reading.
    fn deliver(&self, epoch: u64, event: AuthEvent<S>) -> bool;

    /// Re-seed the state from the client snapshot after events were dropped.
    ///
    /// Same return contract as [`EventSink::deliver`].
    fn resync(&self, epoch: u64) -> bool;
}

/// Spawn the task that pumps client events into `sink` in arrival order.
pub(crate) fn spawn_event_bridge<S, K>(
    epoch: u64,
    mut events: broadcast::Receiver<EventSlot<S>>,
    sink: Weak<K>,
) -> JoinHandle<()>
where
    S: Clone + Send + Sync + 'static,
    K: EventSink<S>,
{
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(Some(event)) => {
                    let Some(sink) = sink.upgrade() else {
                        break;
                    };
                    if !sink.deliver(epoch, event) {
                        debug!(epoch, "Event bridge detached from stale binding");
                        break;
                    }
                }
                Ok(None) => {
                    trace!(epoch, "Ignoring empty auth event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(epoch, skipped, "Event bridge lagged behind auth client, resyncing");
                    let Some(sink) = sink.upgrade() else {
                        break;
                    };
                    if !sink.resync(epoch) {
                        debug!(epoch, "Event bridge detached from stale binding");
                        break;
                    }
                }
                Err(RecvError::Closed) => {
                    debug!(epoch, "Auth client event stream closed");
                    break;
                }
            }
        }
    })
}
