//! Session state value.
//!
//! `SessionState` is the single value observed by consumers. It is never
//! mutated in place: every update produces a new snapshot that changes exactly
//! one field and carries the other one over from the previous snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse authentication phase reported by the auth client.
///
/// Transitions are driven entirely by client events; this layer never infers
/// a status on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Nothing has been reported yet.
    #[default]
    Initial,
    /// The client is resolving the session.
    Loading,
    /// A valid session is present.
    Authenticated,
    /// No valid session.
    Unauthenticated,
}

impl Status {
    /// Returns the snake_case label used in logs and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Initial => "initial",
            Status::Loading => "loading",
            Status::Authenticated => "authenticated",
            Status::Unauthenticated => "unauthenticated",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of the session payload and its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState<S> {
    /// Client-defined session payload, if any.
    pub session: Option<S>,
    /// Current authentication phase.
    pub status: Status,
}

impl<S> SessionState<S> {
    /// The state observed before any client has reported anything.
    pub fn initial() -> Self {
        Self {
            session: None,
            status: Status::Initial,
        }
    }

    /// Build a snapshot from explicit parts.
    pub fn new(session: Option<S>, status: Status) -> Self {
        Self { session, status }
    }

    /// Returns true if the status is `Authenticated`.
    pub fn is_authenticated(&self) -> bool {
        self.status == Status::Authenticated
    }

    /// Returns true if the status is `Loading`.
    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }
}

impl<S: Clone> SessionState<S> {
    /// Returns a new snapshot with only the status replaced.
    pub fn with_status(&self, status: Status) -> Self {
        Self {
            session: self.session.clone(),
            status,
        }
    }

    /// Returns a new snapshot with only the session replaced.
    pub fn with_session(&self, session: Option<S>) -> Self {
        Self {
            session,
            status: self.status,
        }
    }
}

impl<S> Default for SessionState<S> {
    fn default() -> Self {
        Self::initial()
    }
}
