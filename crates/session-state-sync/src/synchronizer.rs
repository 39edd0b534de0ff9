//! State synchronizer: the coordinator between the auth client, the
//! foreground monitor and the refetch scheduler.
//!
//! ## Binding lifecycle
//!
//! ```text
//! ┌──────────┐  bind(client)   ┌──────────────────┐
//! │ Unbound  │ ──────────────▶ │ Bound { epoch }  │ ◀─┐ bind(other client):
//! └──────────┘                 └────────┬─────────┘ ──┘ release, epoch += 1
//!       ▲          dispose / drop       │
//!       └───────────────────────────────┘
//! ```
//!
//! Every binding owns an event bridge task, a foreground watch task and a
//! refetch scheduler. All of them carry the binding's epoch and re-check it
//! under the coordinator lock before touching state, so callbacks that race a
//! rebind or a teardown are discarded.

use crate::bridge::{fold_event, spawn_event_bridge, EventSink};
use crate::client::{AuthClient, AuthEvent};
use crate::config::SyncConfig;
use crate::foreground::{ForegroundSource, Visibility};
use crate::observer::StateObserver;
use crate::scheduler::{RefetchAction, RefetchScheduler};
use crate::state::SessionState;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the pass-through event channel.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Observable binding phase of the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingPhase {
    /// No client bound.
    Unbound,
    /// Bound to a client; `epoch` identifies the binding.
    Bound { epoch: u64 },
}

/// What asked for a refetch. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefetchTrigger {
    Timer,
    Foreground,
    Manual,
}

/// Resources held for the currently bound client.
struct Binding<C: AuthClient> {
    epoch: u64,
    client: Arc<C>,
    events: JoinHandle<()>,
    foreground: JoinHandle<()>,
    scheduler: RefetchScheduler,
}

impl<C: AuthClient> Binding<C> {
    fn release(mut self) {
        self.scheduler.stop();
        self.foreground.abort();
        self.events.abort();
        debug!(epoch = self.epoch, "Binding released");
    }
}

struct Coordinator<C: AuthClient> {
    epoch: u64,
    binding: Option<Binding<C>>,
}

impl<C: AuthClient> Coordinator<C> {
    fn current(&self, epoch: u64) -> Option<&Binding<C>> {
        self.binding.as_ref().filter(|binding| binding.epoch == epoch)
    }
}

struct Shared<C: AuthClient> {
    coordinator: Mutex<Coordinator<C>>,
    state_tx: watch::Sender<SessionState<C::Session>>,
    events_tx: broadcast::Sender<AuthEvent<C::Session>>,
    foreground: Arc<dyn ForegroundSource>,
    config: SyncConfig,
}

impl<C: AuthClient> Shared<C> {
    /// Replace the state, notifying observers only on an actual change.
    fn publish(&self, next: SessionState<C::Session>) {
        self.state_tx.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.coordinator.lock().current(epoch).is_some()
    }

    /// Spawn a best-effort refetch unless the process is backgrounded.
    fn spawn_refetch(self: &Arc<Self>, client: Arc<C>, epoch: u64, trigger: RefetchTrigger) {
        if !self.foreground.is_foreground() {
            debug!(epoch, trigger = ?trigger, "Skipping refetch while backgrounded");
            return;
        }

        let shared = Arc::downgrade(self);
        tokio::spawn(async move {
            let result = client.refetch_session().await;

            let current = shared
                .upgrade()
                .map(|shared| shared.is_current(epoch))
                .unwrap_or(false);
            if !current {
                debug!(epoch, trigger = ?trigger, "Discarding refetch result from stale binding");
                return;
            }

            match result {
                Ok(()) => debug!(epoch, trigger = ?trigger, "Session refetched"),
                Err(error) => warn!(
                    epoch,
                    trigger = ?trigger,
                    error = %error,
                    "Session refetch failed"
                ),
            }
        });
    }

    /// React to a foreground transition. Returns false for a stale binding.
    fn on_visibility(self: &Arc<Self>, epoch: u64, visibility: Visibility) -> bool {
        let mut coordinator = self.coordinator.lock();
        let Some(binding) = coordinator
            .binding
            .as_mut()
            .filter(|binding| binding.epoch == epoch)
        else {
            return false;
        };

        match visibility {
            Visibility::Background => {
                binding.scheduler.stop();
                debug!(epoch, "App backgrounded, refetch timer paused");
            }
            Visibility::Foreground => {
                binding
                    .scheduler
                    .configure(self.config.effective_interval(), true);
                debug!(epoch, "App foregrounded, refetch timer resumed");

                if self.config.refetch_on_foreground {
                    self.spawn_refetch(binding.client.clone(), epoch, RefetchTrigger::Foreground);
                }
            }
        }

        true
    }

    fn refetch_action(self: &Arc<Self>, client: Arc<C>, epoch: u64) -> RefetchAction {
        let shared = Arc::downgrade(self);
        Arc::new(move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            // A tick racing a rebind or teardown must not reach the old client.
            if !shared.is_current(epoch) {
                debug!(epoch, "Ignoring timer tick from stale binding");
                return;
            }
            shared.spawn_refetch(client.clone(), epoch, RefetchTrigger::Timer);
        })
    }
}

impl<C: AuthClient> EventSink<C::Session> for Shared<C> {
    fn deliver(&self, epoch: u64, event: AuthEvent<C::Session>) -> bool {
        let coordinator = self.coordinator.lock();
        if coordinator.current(epoch).is_none() {
            return false;
        }

        self.state_tx
            .send_if_modified(|state| match fold_event(state, &event) {
                Some(next) if next != *state => {
                    *state = next;
                    true
                }
                _ => false,
            });

        debug!(epoch, kind = event.kind(), "Auth event applied");

        // No listeners is fine; the pass-through stream is optional.
        let _ = self.events_tx.send(event);
        true
    }

    fn resync(&self, epoch: u64) -> bool {
        let coordinator = self.coordinator.lock();
        let Some(binding) = coordinator.current(epoch) else {
            return false;
        };

        let snapshot = SessionState::new(
            binding.client.current_session(),
            binding.client.current_status(),
        );
        info!(epoch, status = %snapshot.status, "Session state resynced from client snapshot");
        self.publish(snapshot);
        true
    }
}

fn spawn_foreground_watch<C: AuthClient>(
    epoch: u64,
    mut visibility: watch::Receiver<Visibility>,
    shared: Weak<Shared<C>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while visibility.changed().await.is_ok() {
            let current = *visibility.borrow_and_update();
            let Some(shared) = shared.upgrade() else {
                break;
            };
            if !shared.on_visibility(epoch, current) {
                break;
            }
        }
    })
}

/// Keeps an observable [`SessionState`] in sync with an auth client.
///
/// Dropping the synchronizer tears down the current binding. The last state
/// stays readable through observers created earlier until they are dropped.
pub struct SessionSynchronizer<C: AuthClient> {
    shared: Arc<Shared<C>>,
}

impl<C: AuthClient> SessionSynchronizer<C> {
    /// Create an unbound synchronizer.
    pub fn new(config: SyncConfig, foreground: Arc<dyn ForegroundSource>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::initial());
        let (events_tx, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                coordinator: Mutex::new(Coordinator {
                    epoch: 0,
                    binding: None,
                }),
                state_tx,
                events_tx,
                foreground,
                config,
            }),
        }
    }

    /// Bind to `client`, replacing any previous binding.
    ///
    /// The previous binding is fully released before the new one is set up.
    /// Binding the client that is already bound is a no-op. Must be called
    /// from within a tokio runtime.
    pub fn bind(&self, client: Arc<C>) {
        let shared = &self.shared;
        let mut coordinator = shared.coordinator.lock();

        if let Some(binding) = coordinator.binding.as_ref() {
            if Arc::ptr_eq(&binding.client, &client) {
                debug!(epoch = binding.epoch, "Client already bound");
                return;
            }
        }

        if let Some(previous) = coordinator.binding.take() {
            info!(epoch = previous.epoch, "Replacing bound auth client");
            previous.release();
        }

        coordinator.epoch += 1;
        let epoch = coordinator.epoch;

        // Subscribe before reading the snapshot so nothing emitted in between
        // is lost; queued events are folded on top of the seed.
        let events = spawn_event_bridge(epoch, client.subscribe(), Arc::downgrade(shared));
        shared.publish(SessionState::new(
            client.current_session(),
            client.current_status(),
        ));

        let foreground =
            spawn_foreground_watch(epoch, shared.foreground.subscribe(), Arc::downgrade(shared));

        let mut scheduler = RefetchScheduler::new(shared.refetch_action(client.clone(), epoch));
        scheduler.configure(shared.config.effective_interval(), true);

        info!(
            epoch,
            status = %client.current_status(),
            timer = scheduler.is_running(),
            "Auth client bound"
        );

        coordinator.binding = Some(Binding {
            epoch,
            client,
            events,
            foreground,
            scheduler,
        });
    }

    /// Release the current binding. The last state remains visible.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        let mut coordinator = self.shared.coordinator.lock();
        if let Some(binding) = coordinator.binding.take() {
            info!(epoch = binding.epoch, "Auth client unbound");
            binding.release();
        }
    }

    /// Ask the bound client for a best-effort refetch now.
    ///
    /// Returns false when nothing is bound. A refetch requested while
    /// backgrounded is skipped.
    pub fn refetch_now(&self) -> bool {
        let coordinator = self.shared.coordinator.lock();
        let Some(binding) = coordinator.binding.as_ref() else {
            return false;
        };
        self.shared
            .spawn_refetch(binding.client.clone(), binding.epoch, RefetchTrigger::Manual);
        true
    }

    /// Current state snapshot. Initial before any client is bound.
    pub fn state(&self) -> SessionState<C::Session> {
        self.shared.state_tx.borrow().clone()
    }

    /// Observe the state and its projections.
    pub fn observe(&self) -> StateObserver<C::Session> {
        StateObserver::new(self.shared.state_tx.subscribe())
    }

    /// Raw client events from the current binding, in arrival order.
    pub fn events(&self) -> broadcast::Receiver<AuthEvent<C::Session>> {
        self.shared.events_tx.subscribe()
    }

    /// The bound client, if any.
    pub fn client(&self) -> Option<Arc<C>> {
        self.shared
            .coordinator
            .lock()
            .binding
            .as_ref()
            .map(|binding| binding.client.clone())
    }

    pub fn phase(&self) -> BindingPhase {
        match self.shared.coordinator.lock().binding.as_ref() {
            Some(binding) => BindingPhase::Bound {
                epoch: binding.epoch,
            },
            None => BindingPhase::Unbound,
        }
    }

    /// Whether a refetch timer is armed for the current binding.
    pub fn timer_active(&self) -> bool {
        self.shared
            .coordinator
            .lock()
            .binding
            .as_ref()
            .is_some_and(|binding| binding.scheduler.is_running())
    }

    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }
}

impl<C: AuthClient> Drop for SessionSynchronizer<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
