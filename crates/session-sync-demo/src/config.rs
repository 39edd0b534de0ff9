//! Demo configuration.
//!
//! Precedence, lowest first: built-in defaults, the JSON config file,
//! `SESSION_SYNC_*` environment variables, command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use session_state_sync::SyncConfig;
use std::path::{Path, PathBuf};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default simulated network latency of the in-memory client.
pub const DEFAULT_LATENCY_MS: u64 = 150;

pub const ENV_LOG_LEVEL: &str = "SESSION_SYNC_LOG_LEVEL";
pub const ENV_REFETCH_INTERVAL_MS: &str = "SESSION_SYNC_REFETCH_INTERVAL_MS";

/// Demo configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Log filter directive (trace, debug, info, warn, error).
    pub log_level: String,
    /// Background refetch period. Absent or zero disables the timer.
    pub refetch_interval_ms: Option<u64>,
    /// Refetch once when the app returns to the foreground.
    pub refetch_on_foreground: bool,
    /// User restored by the cache-recovery bootstrap.
    pub cached_user: Option<String>,
    /// Simulated latency of every client call.
    pub latency_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            refetch_interval_ms: None,
            refetch_on_foreground: true,
            cached_user: None,
            latency_ms: DEFAULT_LATENCY_MS,
        }
    }
}

/// Default config file: `~/.unbound/session-sync-demo.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".unbound").join("session-sync-demo.json"))
}

impl DemoConfig {
    /// Load from `path` (or the default location), then apply environment
    /// overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::load_from_file(&path)?,
            _ => Self::default(),
        };

        config.load_from_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply `SESSION_SYNC_*` overrides from `lookup`.
    pub fn load_from_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }

        if let Some(raw) = lookup(ENV_REFETCH_INTERVAL_MS) {
            let interval: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_REFETCH_INTERVAL_MS} must be milliseconds, got {raw:?}"))?;
            self.refetch_interval_ms = Some(interval);
        }

        Ok(())
    }

    /// Library configuration derived from this config.
    pub fn sync_config(&self) -> SyncConfig {
        let config = SyncConfig::default().with_refetch_on_foreground(self.refetch_on_foreground);
        match self.refetch_interval_ms {
            Some(ms) => config.with_refetch_interval_ms(ms),
            None => config,
        }
    }
}
