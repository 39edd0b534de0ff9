//! In-memory auth client.
//!
//! Simulates a backend with a configurable latency. The "server side" holds
//! whether the session is still valid; refetching reconciles the local
//! snapshot with it and emits the resulting events.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use session_state_sync::{AuthClient, AuthEvent, EventSlot, Status};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 64;

/// Session payload of the demo client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemoSession {
    pub user_id: String,
    pub access_token: String,
}

impl DemoSession {
    fn issue(user_id: &str, generation: u64) -> Self {
        Self {
            user_id: user_id.to_string(),
            access_token: format!("tok-{user_id}-{generation}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum MemoryClientError {
    #[error("backend unreachable")]
    Offline,
}

struct Snapshot {
    session: Option<DemoSession>,
    status: Status,
    /// Bumped on every issued token.
    generation: u64,
    /// Server-side validity of the current session.
    revoked: bool,
}

/// Auth client backed by process memory.
pub struct MemoryAuthClient {
    snapshot: Mutex<Snapshot>,
    events: broadcast::Sender<EventSlot<DemoSession>>,
    cached_user: Option<String>,
    latency: Duration,
    offline: AtomicBool,
}

impl MemoryAuthClient {
    pub fn new(cached_user: Option<String>, latency: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            snapshot: Mutex::new(Snapshot {
                session: None,
                status: Status::Initial,
                generation: 0,
                revoked: false,
            }),
            events,
            cached_user,
            latency,
            offline: AtomicBool::new(false),
        }
    }

    /// Sign `user_id` in, replacing any current session.
    pub async fn sign_in(&self, user_id: &str) -> Result<(), MemoryClientError> {
        self.set_status(Status::Loading);
        self.round_trip().await.inspect_err(|_| {
            self.set_status(Status::Unauthenticated);
            self.emit(AuthEvent::Error {
                message: "sign-in failed: backend unreachable".to_string(),
            });
        })?;

        self.establish(user_id);
        self.emit(AuthEvent::SignedIn);
        info!(user_id, "Signed in");
        Ok(())
    }

    /// Sign out locally. Never touches the backend.
    pub fn sign_out(&self) {
        self.clear();
        self.emit(AuthEvent::SignedOut);
        info!("Signed out");
    }

    /// Invalidate the session server-side. Noticed on the next refetch.
    pub fn revoke(&self) {
        self.snapshot.lock().revoked = true;
        debug!("Session revoked on the backend");
    }

    /// Simulate losing or regaining connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn emit(&self, event: AuthEvent<DemoSession>) {
        // No subscribers is fine.
        let _ = self.events.send(Some(event));
    }

    fn set_status(&self, status: Status) {
        self.snapshot.lock().status = status;
        self.emit(AuthEvent::StatusChanged { status });
    }

    fn establish(&self, user_id: &str) {
        let session = {
            let mut snapshot = self.snapshot.lock();
            snapshot.generation += 1;
            snapshot.revoked = false;
            let session = DemoSession::issue(user_id, snapshot.generation);
            snapshot.session = Some(session.clone());
            snapshot.status = Status::Authenticated;
            session
        };
        self.emit(AuthEvent::SessionChanged {
            session: Some(session),
        });
        self.emit(AuthEvent::StatusChanged {
            status: Status::Authenticated,
        });
    }

    fn clear(&self) {
        {
            let mut snapshot = self.snapshot.lock();
            snapshot.session = None;
            snapshot.status = Status::Unauthenticated;
            snapshot.revoked = false;
        }
        self.emit(AuthEvent::SessionChanged { session: None });
        self.emit(AuthEvent::StatusChanged {
            status: Status::Unauthenticated,
        });
    }

    async fn round_trip(&self) -> Result<(), MemoryClientError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(MemoryClientError::Offline);
        }
        Ok(())
    }
}

#[async_trait]
impl AuthClient for MemoryAuthClient {
    type Session = DemoSession;
    type Error = MemoryClientError;

    fn current_session(&self) -> Option<DemoSession> {
        self.snapshot.lock().session.clone()
    }

    fn current_status(&self) -> Status {
        self.snapshot.lock().status
    }

    async fn refetch_session(&self) -> Result<(), MemoryClientError> {
        self.round_trip().await?;

        let (user, revoked) = {
            let snapshot = self.snapshot.lock();
            (
                snapshot.session.as_ref().map(|s| s.user_id.clone()),
                snapshot.revoked,
            )
        };

        match user {
            Some(_) if revoked => {
                info!("Backend rejected session, signing out");
                self.clear();
                self.emit(AuthEvent::SignedOut);
            }
            // Token rotation on every successful refetch.
            Some(user_id) => self.establish(&user_id),
            None => {}
        }
        Ok(())
    }

    async fn recover_from_cache(&self) -> Result<(), MemoryClientError> {
        self.set_status(Status::Loading);
        self.round_trip()
            .await
            .inspect_err(|_| self.set_status(Status::Unauthenticated))?;

        match self.cached_user.clone() {
            Some(user_id) => {
                self.establish(&user_id);
                info!(user_id = %user_id, "Session recovered from cache");
            }
            None => self.set_status(Status::Unauthenticated),
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EventSlot<DemoSession>> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(cached: Option<&str>) -> MemoryAuthClient {
        MemoryAuthClient::new(cached.map(str::to_string), Duration::ZERO)
    }

    fn drain(rx: &mut broadcast::Receiver<EventSlot<DemoSession>>) -> Vec<String> {
        let mut kinds = Vec::new();
        while let Ok(Some(event)) = rx.try_recv() {
            kinds.push(event.kind().to_string());
        }
        kinds
    }

    #[tokio::test]
    async fn test_sign_in_emits_session_and_status() {
        let client = client(None);
        let mut rx = client.subscribe();

        client.sign_in("alice").await.unwrap();

        assert_eq!(client.current_status(), Status::Authenticated);
        assert_eq!(client.current_session().unwrap().user_id, "alice");
        assert_eq!(
            drain(&mut rx),
            vec!["status_changed", "session_changed", "status_changed", "signed_in"]
        );
    }

    #[tokio::test]
    async fn test_sign_in_offline_fails() {
        let client = client(None);
        client.set_offline(true);

        assert!(client.sign_in("alice").await.is_err());
        assert_eq!(client.current_status(), Status::Unauthenticated);
        assert!(client.current_session().is_none());
    }

    #[tokio::test]
    async fn test_refetch_rotates_token() {
        let client = client(None);
        client.sign_in("alice").await.unwrap();
        let before = client.current_session().unwrap();

        client.refetch_session().await.unwrap();

        let after = client.current_session().unwrap();
        assert_eq!(after.user_id, before.user_id);
        assert_ne!(after.access_token, before.access_token);
    }

    #[tokio::test]
    async fn test_refetch_after_revoke_signs_out() {
        let client = client(None);
        client.sign_in("alice").await.unwrap();
        client.revoke();

        client.refetch_session().await.unwrap();

        assert_eq!(client.current_status(), Status::Unauthenticated);
        assert!(client.current_session().is_none());
    }

    #[tokio::test]
    async fn test_refetch_offline_keeps_snapshot() {
        let client = client(None);
        client.sign_in("alice").await.unwrap();
        client.set_offline(true);

        assert!(client.refetch_session().await.is_err());
        assert_eq!(client.current_status(), Status::Authenticated);
    }

    #[tokio::test]
    async fn test_recover_from_cache() {
        let cached = client(Some("bob"));
        cached.recover_from_cache().await.unwrap();
        assert_eq!(cached.current_session().unwrap().user_id, "bob");

        let empty = client(None);
        empty.recover_from_cache().await.unwrap();
        assert_eq!(empty.current_status(), Status::Unauthenticated);
    }
}
