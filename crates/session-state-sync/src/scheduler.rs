//! Refetch scheduler.
//!
//! Owns at most one repeating timer. Each tick invokes the refetch action,
//! which must not block: the action spawns the actual refetch and returns.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Non-blocking callback invoked on every timer tick.
pub type RefetchAction = Arc<dyn Fn() + Send + Sync>;

struct ActiveTimer {
    period: Duration,
    task: JoinHandle<()>,
}

/// Single-timer scheduler for periodic refetches.
pub struct RefetchScheduler {
    action: RefetchAction,
    timer: Option<ActiveTimer>,
    timers_started: u64,
}

impl RefetchScheduler {
    /// Create an idle scheduler for the given action.
    pub fn new(action: RefetchAction) -> Self {
        Self {
            action,
            timer: None,
            timers_started: 0,
        }
    }

    /// Apply the configured interval.
    ///
    /// With no usable interval, or when refetching is not allowed right now,
    /// any running timer is stopped. Otherwise the timer is (re)started; the
    /// first tick lands one full `interval` from now.
    pub fn configure(&mut self, interval: Option<Duration>, allowed_now: bool) {
        let Some(period) = interval.filter(|period| !period.is_zero()) else {
            self.stop();
            return;
        };

        if !allowed_now {
            self.stop();
            return;
        }

        self.restart(period);
    }

    /// Cancel the running timer, if any. Idempotent.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.task.abort();
            debug!(period_ms = timer.period.as_millis() as u64, "Refetch timer stopped");
        }
    }

    /// Returns true while a timer is armed.
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Period of the armed timer.
    pub fn period(&self) -> Option<Duration> {
        self.timer.as_ref().map(|timer| timer.period)
    }

    /// Number of timers armed over the scheduler's lifetime.
    pub fn timers_started(&self) -> u64 {
        self.timers_started
    }

    fn restart(&mut self, period: Duration) {
        self.stop();

        let action = self.action.clone();
        let first_tick = Instant::now() + period;
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                action();
            }
        });

        self.timer = Some(ActiveTimer { period, task });
        self.timers_started += 1;
        debug!(period_ms = period.as_millis() as u64, "Refetch timer armed");
    }
}

impl Drop for RefetchScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
