//! # Observability
//!
//! Shared tracing setup for the session sync crates.
//!
//! Library crates only emit events through the `tracing` macros. Binaries
//! call [`init`] or [`init_with_config`] once at startup to decide where
//! those events go:
//!
//! - stderr, compact or JSON, for interactive runs
//! - an append-only JSONL file that can be tailed while the process runs
//!
//! `RUST_LOG` always wins over the configured default level.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() -> anyhow::Result<()> {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "session-sync-demo".into(),
//!         default_level: "debug".into(),
//!         ..Default::default()
//!     })?;
//!
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

mod writer;

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

pub use writer::{default_log_path, LogFile};

/// Output format for the stderr sink. The file sink is always JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, used for the default log file name.
    pub service_name: String,

    /// Default filter directive (e.g. "info", "session_state_sync=debug").
    /// Overridden by `RUST_LOG`.
    pub default_level: String,

    /// Optional log file. When stderr output is disabled and no path is
    /// given, logs go to [`default_log_path`].
    pub log_path: Option<PathBuf>,

    /// Emit logs to stderr.
    pub also_stderr: bool,

    /// Format of the stderr output.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// File the subscriber will write to, if any.
    pub fn resolved_log_path(&self) -> Option<PathBuf> {
        match &self.log_path {
            Some(path) => Some(path.clone()),
            None if !self.also_stderr => Some(default_log_path(&self.service_name)),
            None => None,
        }
    }
}

/// Errors raised while installing the global subscriber.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("global tracing subscriber already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) -> Result<Option<PathBuf>, InitError> {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    })
}

/// Initialize logging with custom configuration.
///
/// Returns the log file path when a file sink was installed.
pub fn init_with_config(config: LogConfig) -> Result<Option<PathBuf>, InitError> {
    let log_file = match config.resolved_log_path() {
        Some(path) => Some(
            LogFile::open(&path).map_err(|source| InitError::LogFile {
                path: path.clone(),
                source,
            })?,
        ),
        None => None,
    };

    let stderr_layer = config.also_stderr.then(|| match config.format {
        LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
            .boxed(),
    });

    let file_layer = log_file.clone().map(|file| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_current_span(true)
            .with_writer(file)
    });

    tracing_subscriber::registry()
        .with(env_filter(&config.default_level))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    let path = log_file.map(|file| file.path().to_path_buf());
    tracing::info!(
        service = %config.service_name,
        log_path = ?path,
        "observability initialized"
    );
    Ok(path)
}

/// Filter from `RUST_LOG`, falling back to `default_level`.
///
/// An unparsable default falls back to "info".
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

pub use tracing::Level;
