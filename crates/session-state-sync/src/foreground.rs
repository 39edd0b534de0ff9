//! Foreground monitor.
//!
//! Classifies host lifecycle signals into foreground/background and notifies
//! subscribers only when the classification actually changes. The coordinator
//! depends on it through [`ForegroundSource`] so hosts can plug in their own
//! lifecycle plumbing.

use tokio::sync::watch;
use tracing::debug;

/// Raw lifecycle signal reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// Visible and accepting input.
    Resumed,
    /// Visible but not accepting input.
    Inactive,
    /// Not visible.
    Paused,
    /// Hidden by the window system.
    Hidden,
    /// The process is terminating.
    Detached,
}

/// Process interactivity as seen by the refetch scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Foreground,
    Background,
}

impl LifecycleSignal {
    /// Map a signal to a visibility. `Detached` maps to nothing: no timer
    /// action is meaningful once the process is going away.
    pub fn classify(self) -> Option<Visibility> {
        match self {
            LifecycleSignal::Resumed => Some(Visibility::Foreground),
            LifecycleSignal::Inactive | LifecycleSignal::Paused | LifecycleSignal::Hidden => {
                Some(Visibility::Background)
            }
            LifecycleSignal::Detached => None,
        }
    }
}

/// Subscribe/unsubscribe interface the coordinator depends on.
///
/// Unsubscribing is dropping the receiver.
pub trait ForegroundSource: Send + Sync + 'static {
    /// Receive visibility transitions. The receiver starts at the current value.
    fn subscribe(&self) -> watch::Receiver<Visibility>;

    /// Current visibility.
    fn visibility(&self) -> Visibility;

    fn is_foreground(&self) -> bool {
        self.visibility() == Visibility::Foreground
    }
}

/// Default foreground monitor fed by the host's lifecycle signals.
#[derive(Debug)]
pub struct ForegroundMonitor {
    tx: watch::Sender<Visibility>,
}

impl ForegroundMonitor {
    /// Create a monitor with the given starting visibility.
    pub fn new(initial: Visibility) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Feed a lifecycle signal. Returns the new visibility if it changed.
    pub fn handle(&self, signal: LifecycleSignal) -> Option<Visibility> {
        let next = signal.classify()?;
        let changed = self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });

        if changed {
            debug!(signal = ?signal, visibility = ?next, "Foreground transition");
            Some(next)
        } else {
            None
        }
    }
}

impl Default for ForegroundMonitor {
    /// Processes start in the foreground.
    fn default() -> Self {
        Self::new(Visibility::Foreground)
    }
}

impl ForegroundSource for ForegroundMonitor {
    fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.tx.subscribe()
    }

    fn visibility(&self) -> Visibility {
        *self.tx.borrow()
    }
}
