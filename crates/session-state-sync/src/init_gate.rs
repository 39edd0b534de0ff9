//! One-time bootstrap of the auth client.
//!
//! The gate kicks off cache recovery; it never gates visibility. Consumers
//! render from whatever state is current and the recovery result reaches them
//! through the client's normal event stream.

use crate::client::AuthClient;
use crate::error::{SyncError, SyncResult};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Cached result of the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// `recover_from_cache` completed.
    Recovered,
    /// `recover_from_cache` failed; the reason is kept for diagnostics only.
    Failed(String),
}

/// Runs `recover_from_cache` at most once.
pub struct InitGate<C: AuthClient> {
    client: Option<Arc<C>>,
    outcome: OnceCell<BootstrapOutcome>,
}

impl<C: AuthClient> InitGate<C> {
    pub fn new(client: Option<Arc<C>>) -> Self {
        Self {
            client,
            outcome: OnceCell::new(),
        }
    }

    /// Run the bootstrap, or return the cached outcome.
    ///
    /// Concurrent callers await the same in-flight run. Only a missing client
    /// is reported as an error; a failed recovery is cached as
    /// [`BootstrapOutcome::Failed`].
    pub async fn run(&self) -> SyncResult<BootstrapOutcome> {
        let client = self.client.as_ref().ok_or(SyncError::MissingClient)?;

        let outcome = self
            .outcome
            .get_or_init(|| async {
                match client.recover_from_cache().await {
                    Ok(()) => {
                        info!("Auth session recovery from cache complete");
                        BootstrapOutcome::Recovered
                    }
                    Err(error) => {
                        warn!(error = %error, "Auth session recovery from cache failed");
                        BootstrapOutcome::Failed(error.to_string())
                    }
                }
            })
            .await;

        Ok(outcome.clone())
    }

    /// The cached outcome, without waiting.
    pub fn outcome(&self) -> Option<BootstrapOutcome> {
        self.outcome.get().cloned()
    }

    pub fn has_completed(&self) -> bool {
        self.outcome.initialized()
    }
}
