//! Session sync demo.
//!
//! Usage: session-sync-demo [--config <path>] [--refetch-interval-ms <ms>]
//!
//! Drives the session synchronizer with an in-memory auth client. Lifecycle
//! signals and auth actions are read from stdin, one command per line; state
//! changes and client events are printed as they happen.

mod client;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use client::{DemoSession, MemoryAuthClient};
use commands::{Command, HELP};
use config::DemoConfig;
use session_state_sync::{install, AuthSync, AuthSyncOptions, SessionState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Interactive session state sync demo.
#[derive(Parser, Debug)]
#[command(name = "session-sync-demo")]
#[command(about = "Mirror an in-memory auth client into observable session state")]
#[command(version)]
struct Args {
    /// JSON config file. Defaults to ~/.unbound/session-sync-demo.json.
    #[arg(long, env = "SESSION_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Background refetch period in milliseconds (0 disables).
    #[arg(long)]
    refetch_interval_ms: Option<u64>,

    /// Do not refetch when returning to the foreground.
    #[arg(long)]
    no_refetch_on_foreground: bool,

    /// User restored by the startup cache recovery.
    #[arg(long)]
    cached_user: Option<String>,

    /// Simulated backend latency in milliseconds.
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,

    /// Also append JSON logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Flags win over the file and the environment.
    fn apply(&self, config: &mut DemoConfig) {
        if let Some(ms) = self.refetch_interval_ms {
            config.refetch_interval_ms = Some(ms);
        }
        if self.no_refetch_on_foreground {
            config.refetch_on_foreground = false;
        }
        if let Some(user) = &self.cached_user {
            config.cached_user = Some(user.clone());
        }
        if let Some(ms) = self.latency_ms {
            config.latency_ms = ms;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

fn render(state: &SessionState<DemoSession>) -> String {
    match &state.session {
        Some(session) => format!(
            "{} user={} token={}",
            state.status, session.user_id, session.access_token
        ),
        None => format!("{} (no session)", state.status),
    }
}

/// Print state changes and raw client events until the sync is torn down.
fn spawn_printers(sync: &AuthSync<MemoryAuthClient>) {
    let mut observer = sync.observe();
    tokio::spawn(async move {
        while let Ok(state) = observer.changed().await {
            println!("state: {}", render(&state));
        }
    });

    let mut events = sync.events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("event: {}", event.kind()),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Execute one command. Returns false when the demo should exit.
async fn execute(
    command: Command,
    sync: &AuthSync<MemoryAuthClient>,
    client: &MemoryAuthClient,
) -> bool {
    match command {
        Command::Lifecycle(signal) => match sync.handle_lifecycle(signal) {
            Some(visibility) => println!("visibility: {visibility:?}"),
            None => println!("visibility unchanged"),
        },
        Command::SignIn(user) => {
            if let Err(e) = client.sign_in(&user).await {
                warn!(error = %e, "Sign-in failed");
            }
        }
        Command::SignOut => client.sign_out(),
        Command::Revoke => client.revoke(),
        Command::Offline(offline) => {
            client.set_offline(offline);
            println!("backend {}", if offline { "offline" } else { "online" });
        }
        Command::Refetch => {
            if !sync.refetch_now() {
                println!("no client bound");
            }
        }
        Command::State => {
            println!("state: {}", render(&sync.state()));
            println!(
                "bootstrap: {:?}, timer: {}",
                sync.bootstrap_outcome(),
                sync.synchronizer().timer_active()
            );
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = DemoConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    observability::init_with_config(observability::LogConfig {
        service_name: "session-sync-demo".into(),
        default_level: config.log_level.clone(),
        log_path: args.log_file.clone(),
        also_stderr: true,
        format: if args.log_json {
            observability::LogFormat::Json
        } else {
            observability::LogFormat::Compact
        },
    })?;

    info!(
        refetch_interval_ms = ?config.refetch_interval_ms,
        refetch_on_foreground = config.refetch_on_foreground,
        cached_user = ?config.cached_user,
        "Configuration loaded"
    );

    let client = Arc::new(MemoryAuthClient::new(
        config.cached_user.clone(),
        Duration::from_millis(config.latency_ms),
    ));
    let sync_config = config.sync_config();

    let mut options = AuthSyncOptions::new(client.clone())
        .with_refetch_on_foreground(sync_config.refetch_on_foreground);
    if let Some(interval) = sync_config.effective_interval() {
        options = options.with_refetch_interval(interval);
    }
    let sync = install(options)?;

    spawn_printers(&sync);
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(command) => {
                        if !execute(command, &sync, &client).await {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal, exiting...");
                break;
            }
        }
    }

    sync.shutdown();
    Ok(())
}
