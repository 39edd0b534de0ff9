//! Contract consumed from the external auth client.
//!
//! The client owns HTTP calls, token storage, OAuth plumbing and its session
//! cache. This layer only reads its snapshot, asks it to refetch or recover,
//! and listens to its event stream.

use crate::state::Status;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Lifecycle event emitted by the auth client.
///
/// Only `SessionChanged` and `StatusChanged` affect the session state. Every
/// other kind is forwarded untouched to host-level listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent<S> {
    /// The session payload changed (possibly to none).
    SessionChanged { session: Option<S> },
    /// The authentication status changed.
    StatusChanged { status: Status },
    /// A sign-in flow completed.
    SignedIn,
    /// The user signed out (locally or remotely).
    SignedOut,
    /// The client reports an error worth surfacing to the user.
    Error { message: String },
    /// Client-specific event kind.
    Custom {
        kind: String,
        payload: Option<String>,
    },
}

impl<S> AuthEvent<S> {
    /// Short label for logging.
    pub fn kind(&self) -> &str {
        match self {
            AuthEvent::SessionChanged { .. } => "session_changed",
            AuthEvent::StatusChanged { .. } => "status_changed",
            AuthEvent::SignedIn => "signed_in",
            AuthEvent::SignedOut => "signed_out",
            AuthEvent::Error { .. } => "error",
            AuthEvent::Custom { kind, .. } => kind,
        }
    }
}

/// Item carried by the client's event stream.
///
/// `None` is an empty sentinel, not an update, and is dropped by the bridge.
pub type EventSlot<S> = Option<AuthEvent<S>>;

/// Narrow view of the external auth client.
///
/// Implementations must be cheap to share: the synchronizer holds them behind
/// an `Arc` and never assumes it is the sole owner.
#[async_trait]
pub trait AuthClient: Send + Sync + 'static {
    /// Client-defined session payload.
    type Session: Clone + PartialEq + Send + Sync + 'static;

    /// Error reported by refetch and cache recovery.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Snapshot of the client's current session.
    fn current_session(&self) -> Option<Self::Session>;

    /// Snapshot of the client's current status.
    fn current_status(&self) -> Status;

    /// Re-query the backend for the current session. Best effort.
    async fn refetch_session(&self) -> Result<(), Self::Error>;

    /// Restore a previously cached session on startup.
    async fn recover_from_cache(&self) -> Result<(), Self::Error>;

    /// Subscribe to the client's lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<EventSlot<Self::Session>>;
}
