//! Test harness for synchronizer tests.
//!
//! Provides:
//! - MockAuthClient: scriptable auth client with call counters
//! - ManualForeground: host-driven foreground source
//! - settle: lets spawned tasks run on the paused test runtime

use crate::client::{AuthClient, AuthEvent, EventSlot};
use crate::foreground::{ForegroundSource, Visibility};
use crate::state::Status;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};

/// Failure reported by the mock client.
#[derive(Error, Debug)]
#[error("mock {0} failed")]
pub struct MockError(pub &'static str);

/// Scriptable auth client.
pub struct MockAuthClient {
    session: Mutex<Option<String>>,
    status: Mutex<Status>,
    events: broadcast::Sender<EventSlot<String>>,
    refetch_calls: AtomicUsize,
    recover_calls: AtomicUsize,
    fail_refetch: AtomicBool,
    fail_recover: AtomicBool,
    refetch_delay: Mutex<Option<Duration>>,
    recover_delay: Mutex<Option<Duration>>,
    /// Events emitted after each successful refetch.
    refetch_emits: Mutex<Vec<AuthEvent<String>>>,
}

impl MockAuthClient {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            session: Mutex::new(None),
            status: Mutex::new(Status::Initial),
            events,
            refetch_calls: AtomicUsize::new(0),
            recover_calls: AtomicUsize::new(0),
            fail_refetch: AtomicBool::new(false),
            fail_recover: AtomicBool::new(false),
            refetch_delay: Mutex::new(None),
            recover_delay: Mutex::new(None),
            refetch_emits: Mutex::new(Vec::new()),
        }
    }

    /// Create a client whose snapshot already holds a session.
    pub fn with_snapshot(session: Option<&str>, status: Status) -> Self {
        let client = Self::new();
        *client.session.lock() = session.map(str::to_string);
        *client.status.lock() = status;
        client
    }

    /// Replace the snapshot without emitting anything.
    pub fn set_snapshot(&self, session: Option<&str>, status: Status) {
        *self.session.lock() = session.map(str::to_string);
        *self.status.lock() = status;
    }

    /// Emit an event on the client's stream.
    pub fn emit(&self, event: AuthEvent<String>) {
        let _ = self.events.send(Some(event));
    }

    /// Emit the empty sentinel.
    pub fn emit_empty(&self) {
        let _ = self.events.send(None);
    }

    /// Number of live event subscriptions.
    pub fn subscribers(&self) -> usize {
        self.events.receiver_count()
    }

    pub fn refetch_calls(&self) -> usize {
        self.refetch_calls.load(Ordering::SeqCst)
    }

    pub fn recover_calls(&self) -> usize {
        self.recover_calls.load(Ordering::SeqCst)
    }

    pub fn fail_refetch(&self, fail: bool) {
        self.fail_refetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_recover(&self, fail: bool) {
        self.fail_recover.store(fail, Ordering::SeqCst);
    }

    pub fn set_refetch_delay(&self, delay: Duration) {
        *self.refetch_delay.lock() = Some(delay);
    }

    pub fn set_recover_delay(&self, delay: Duration) {
        *self.recover_delay.lock() = Some(delay);
    }

    pub fn emit_on_refetch(&self, event: AuthEvent<String>) {
        self.refetch_emits.lock().push(event);
    }
}

#[async_trait]
impl AuthClient for MockAuthClient {
    type Session = String;
    type Error = MockError;

    fn current_session(&self) -> Option<String> {
        self.session.lock().clone()
    }

    fn current_status(&self) -> Status {
        *self.status.lock()
    }

    async fn refetch_session(&self) -> Result<(), MockError> {
        self.refetch_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.refetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_refetch.load(Ordering::SeqCst) {
            return Err(MockError("refetch"));
        }

        let emits = self.refetch_emits.lock().clone();
        for event in emits {
            self.emit(event);
        }
        Ok(())
    }

    async fn recover_from_cache(&self) -> Result<(), MockError> {
        self.recover_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.recover_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_recover.load(Ordering::SeqCst) {
            return Err(MockError("recover"));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EventSlot<String>> {
        self.events.subscribe()
    }
}

/// Foreground source set directly by the test, standing in for host plumbing.
pub struct ManualForeground {
    tx: watch::Sender<Visibility>,
}

impl ManualForeground {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Visibility::Foreground);
        Self { tx }
    }

    /// Change visibility and notify subscribers.
    pub fn set(&self, visibility: Visibility) {
        self.tx.send_replace(visibility);
    }

    /// Change visibility without notifying subscribers.
    pub fn set_quietly(&self, visibility: Visibility) {
        self.tx.send_if_modified(|current| {
            *current = visibility;
            false
        });
    }
}

impl ForegroundSource for ManualForeground {
    fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.tx.subscribe()
    }

    fn visibility(&self) -> Visibility {
        *self.tx.borrow()
    }
}

/// Let spawned tasks run without advancing the clock.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
