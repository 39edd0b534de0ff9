//! Refetch configuration.

use std::time::Duration;

/// Configuration read by the synchronizer on every (re)bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Period of the background refetch timer. `None` or zero disables it.
    pub refetch_interval: Option<Duration>,
    /// Trigger one immediate refetch when the app returns to the foreground.
    pub refetch_on_foreground: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refetch_interval: None,
            refetch_on_foreground: true,
        }
    }
}

impl SyncConfig {
    /// Set the refetch interval in milliseconds. Zero disables the timer.
    pub fn with_refetch_interval_ms(mut self, interval_ms: u64) -> Self {
        self.refetch_interval = Some(Duration::from_millis(interval_ms));
        self
    }

    /// Enable or disable the refetch on foreground transitions.
    pub fn with_refetch_on_foreground(mut self, enabled: bool) -> Self {
        self.refetch_on_foreground = enabled;
        self
    }

    /// The timer period, if one should run at all.
    pub fn effective_interval(&self) -> Option<Duration> {
        self.refetch_interval.filter(|interval| !interval.is_zero())
    }
}
