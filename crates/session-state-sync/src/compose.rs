//! Composition entry point.
//!
//! `install` is the only place where the pieces get wired together: it binds
//! the synchronizer to the supplied client, attaches the foreground source,
//! and spawns the init gate without waiting for it.

use crate::client::{AuthClient, AuthEvent};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::foreground::{ForegroundMonitor, ForegroundSource, LifecycleSignal, Visibility};
use crate::init_gate::{BootstrapOutcome, InitGate};
use crate::observer::{Projection, StateObserver};
use crate::state::{SessionState, Status};
use crate::synchronizer::SessionSynchronizer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Where foreground transitions come from.
#[derive(Clone)]
pub enum Foreground {
    /// The built-in monitor, fed through [`AuthSync::handle_lifecycle`].
    Monitor(Arc<ForegroundMonitor>),
    /// Host-provided lifecycle plumbing. The host drives it directly.
    Source(Arc<dyn ForegroundSource>),
}

impl Foreground {
    fn source(&self) -> Arc<dyn ForegroundSource> {
        match self {
            Foreground::Monitor(monitor) => monitor.clone(),
            Foreground::Source(source) => source.clone(),
        }
    }

    fn monitor(&self) -> Option<&Arc<ForegroundMonitor>> {
        match self {
            Foreground::Monitor(monitor) => Some(monitor),
            Foreground::Source(_) => None,
        }
    }
}

impl Default for Foreground {
    fn default() -> Self {
        Foreground::Monitor(Arc::new(ForegroundMonitor::default()))
    }
}

/// Options accepted by [`install`].
pub struct AuthSyncOptions<C: AuthClient> {
    /// The auth client to mirror. Required.
    pub client: Option<Arc<C>>,
    /// Period of the background refetch. `None` or zero disables it.
    pub refetch_interval: Option<Duration>,
    /// Refetch once whenever the app returns to the foreground.
    pub refetch_on_foreground: bool,
    /// Foreground transitions driving the refetch timer.
    pub foreground: Foreground,
}

impl<C: AuthClient> AuthSyncOptions<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client: Some(client),
            ..Self::default()
        }
    }

    pub fn with_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn with_refetch_on_foreground(mut self, enabled: bool) -> Self {
        self.refetch_on_foreground = enabled;
        self
    }

    pub fn with_foreground(mut self, monitor: Arc<ForegroundMonitor>) -> Self {
        self.foreground = Foreground::Monitor(monitor);
        self
    }

    /// Use the host's own foreground source instead of the built-in monitor.
    pub fn with_foreground_source(mut self, source: Arc<dyn ForegroundSource>) -> Self {
        self.foreground = Foreground::Source(source);
        self
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            refetch_interval: self.refetch_interval,
            refetch_on_foreground: self.refetch_on_foreground,
        }
    }
}

impl<C: AuthClient> Default for AuthSyncOptions<C> {
    fn default() -> Self {
        let config = SyncConfig::default();
        Self {
            client: None,
            refetch_interval: config.refetch_interval,
            refetch_on_foreground: config.refetch_on_foreground,
            foreground: Foreground::default(),
        }
    }
}

/// Handle returned by [`install`].
pub struct AuthSync<C: AuthClient> {
    synchronizer: SessionSynchronizer<C>,
    gate: Arc<InitGate<C>>,
    foreground: Foreground,
}

/// Wire the synchronizer, foreground source and init gate for `options`.
///
/// Fails only when no client was supplied. The bootstrap runs in the
/// background; the returned handle is immediately observable. Must be called
/// from within a tokio runtime.
pub fn install<C: AuthClient>(options: AuthSyncOptions<C>) -> SyncResult<AuthSync<C>> {
    let client = options.client.clone().ok_or(SyncError::MissingClient)?;
    let config = options.sync_config();

    let synchronizer = SessionSynchronizer::new(config, options.foreground.source());
    synchronizer.bind(client.clone());

    let gate = Arc::new(InitGate::new(Some(client)));
    let bootstrap = gate.clone();
    tokio::spawn(async move {
        // The outcome is cached in the gate; nothing to propagate here.
        let _ = bootstrap.run().await;
    });

    info!(
        refetch_interval_ms = options.refetch_interval.map(|d| d.as_millis() as u64),
        refetch_on_foreground = options.refetch_on_foreground,
        custom_foreground = options.foreground.monitor().is_none(),
        "Session sync installed"
    );

    Ok(AuthSync {
        synchronizer,
        gate,
        foreground: options.foreground,
    })
}

impl<C: AuthClient> AuthSync<C> {
    /// Current state snapshot.
    pub fn state(&self) -> SessionState<C::Session> {
        self.synchronizer.state()
    }

    pub fn observe(&self) -> StateObserver<C::Session> {
        self.synchronizer.observe()
    }

    /// Derived status observer.
    pub fn status(&self) -> Projection<C::Session, Status> {
        self.synchronizer.observe().status()
    }

    /// Derived session observer.
    pub fn session(&self) -> Projection<C::Session, Option<C::Session>> {
        self.synchronizer.observe().session()
    }

    /// Raw client events for host-level side effects.
    pub fn events(&self) -> broadcast::Receiver<AuthEvent<C::Session>> {
        self.synchronizer.events()
    }

    /// Feed a host lifecycle signal to the built-in foreground monitor.
    ///
    /// Returns the new visibility if it changed. Always `None` when a custom
    /// [`ForegroundSource`] was installed; that source is driven by the host.
    pub fn handle_lifecycle(&self, signal: LifecycleSignal) -> Option<Visibility> {
        let Some(monitor) = self.foreground.monitor() else {
            debug!(signal = ?signal, "Lifecycle signal ignored, custom foreground source installed");
            return None;
        };
        monitor.handle(signal)
    }

    /// Swap in a new client instance.
    pub fn rebind(&self, client: Arc<C>) {
        self.synchronizer.bind(client);
    }

    /// Request a best-effort refetch now.
    pub fn refetch_now(&self) -> bool {
        self.synchronizer.refetch_now()
    }

    /// Wait for the bootstrap outcome. Never needed for rendering.
    pub async fn bootstrap(&self) -> SyncResult<BootstrapOutcome> {
        self.gate.run().await
    }

    pub fn bootstrap_outcome(&self) -> Option<BootstrapOutcome> {
        self.gate.outcome()
    }

    pub fn synchronizer(&self) -> &SessionSynchronizer<C> {
        &self.synchronizer
    }

    /// Release all subscriptions. The last state stays readable.
    pub fn shutdown(&self) {
        self.synchronizer.dispose();
    }
}
