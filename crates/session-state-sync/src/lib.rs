//! Session state synchronization for the Unbound clients.
//!
//! This crate keeps an observable auth state consistent with an external
//! auth client that owns the network calls, token storage and OAuth flows.
//!
//! It provides:
//! - An immutable [`SessionState`] value observed through `tokio::sync::watch`
//! - An event bridge folding client lifecycle events into that state in order
//! - A foreground-gated refetch scheduler with a single repeating timer
//! - A coordinator that rebinds atomically when the client instance changes
//! - A one-time cache-recovery gate that never blocks observers
//!
//! ## Usage
//!
//! ```rust,ignore
//! let sync = session_state_sync::install(
//!     AuthSyncOptions::new(client)
//!         .with_refetch_interval(Duration::from_secs(30))
//!         .with_refetch_on_foreground(true),
//! )?;
//!
//! let mut status = sync.status();
//! while let Ok(status) = status.changed().await {
//!     tracing::info!(%status, "auth status");
//! }
//! ```

mod bridge;
mod client;
mod compose;
mod config;
mod error;
mod foreground;
mod init_gate;
mod observer;
mod scheduler;
mod state;
mod synchronizer;

#[cfg(test)]
mod tests;

pub use bridge::fold_event;
pub use client::{AuthClient, AuthEvent, EventSlot};
pub use compose::{install, AuthSync, AuthSyncOptions, Foreground};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use foreground::{ForegroundMonitor, ForegroundSource, LifecycleSignal, Visibility};
pub use init_gate::{BootstrapOutcome, InitGate};
pub use observer::{Projection, StateObserver};
pub use scheduler::{RefetchAction, RefetchScheduler};
pub use state::{SessionState, Status};
pub use synchronizer::{BindingPhase, SessionSynchronizer};
