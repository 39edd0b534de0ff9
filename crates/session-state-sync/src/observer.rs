//! Read-only views over the session state.
//!
//! Observers never mutate anything. `status` and `session` observers are pure
//! projections of the same underlying channel and only wake when their
//! projected value changes.

use crate::error::{SyncError, SyncResult};
use crate::state::{SessionState, Status};
use tokio::sync::watch;

/// Observer of the full session state.
#[derive(Clone)]
pub struct StateObserver<S> {
    rx: watch::Receiver<SessionState<S>>,
}

impl<S: Clone + PartialEq> StateObserver<S> {
    pub(crate) fn new(rx: watch::Receiver<SessionState<S>>) -> Self {
        Self { rx }
    }

    /// Current snapshot.
    pub fn current(&self) -> SessionState<S> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot.
    pub async fn changed(&mut self) -> SyncResult<SessionState<S>> {
        self.rx.changed().await.map_err(|_| SyncError::Closed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Project onto the status field.
    pub fn status(&self) -> Projection<S, Status> {
        Projection::new(self.rx.clone(), |state| state.status)
    }

    /// Project onto the session field.
    pub fn session(&self) -> Projection<S, Option<S>> {
        Projection::new(self.rx.clone(), |state| state.session.clone())
    }

    /// Access the underlying watch receiver.
    pub fn into_inner(self) -> watch::Receiver<SessionState<S>> {
        self.rx
    }
}

/// Derived observer that yields a single projected field.
pub struct Projection<S, T> {
    rx: watch::Receiver<SessionState<S>>,
    project: fn(&SessionState<S>) -> T,
    last: T,
}

impl<S, T: Clone + PartialEq> Projection<S, T> {
    fn new(mut rx: watch::Receiver<SessionState<S>>, project: fn(&SessionState<S>) -> T) -> Self {
        let last = project(&rx.borrow_and_update());
        Self { rx, project, last }
    }

    /// Current projected value.
    pub fn current(&self) -> T {
        (self.project)(&self.rx.borrow())
    }

    /// Wait until the projected value differs from the last one yielded.
    pub async fn changed(&mut self) -> SyncResult<T> {
        loop {
            self.rx.changed().await.map_err(|_| SyncError::Closed)?;
            let next = (self.project)(&self.rx.borrow_and_update());
            if next != self.last {
                self.last = next.clone();
                return Ok(next);
            }
        }
    }
}
