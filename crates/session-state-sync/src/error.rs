//! Synchronization error types.

use thiserror::Error;

/// Errors surfaced to the host by the synchronization layer.
///
/// Refetch and bootstrap failures never appear here: they are logged and
/// swallowed, and the client reports any resulting state change through its
/// own event stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No auth client was supplied when composing the layer.
    #[error("No auth client supplied at composition time")]
    MissingClient,

    /// The synchronizer backing an observer has been dropped.
    #[error("Session state channel closed")]
    Closed,
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;
