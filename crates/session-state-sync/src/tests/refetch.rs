//! Refetch scheduling against foreground transitions.

use super::harness::{settle, ManualForeground, MockAuthClient};
use crate::client::AuthEvent;
use crate::config::SyncConfig;
use crate::foreground::{ForegroundMonitor, LifecycleSignal, Visibility};
use crate::state::Status;
use crate::synchronizer::SessionSynchronizer;
use std::sync::Arc;
use std::time::Duration;

fn bound(
    interval_ms: u64,
    on_foreground: bool,
) -> (
    SessionSynchronizer<MockAuthClient>,
    Arc<MockAuthClient>,
    Arc<ForegroundMonitor>,
) {
    let monitor = Arc::new(ForegroundMonitor::default());
    let config = SyncConfig::default()
        .with_refetch_interval_ms(interval_ms)
        .with_refetch_on_foreground(on_foreground);
    let sync = SessionSynchronizer::new(config, monitor.clone());
    let client = Arc::new(MockAuthClient::new());
    sync.bind(client.clone());
    (sync, client, monitor)
}

async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
    settle().await;
}

// =============================================================================
// Timer
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_no_interval_means_no_timer() {
    let monitor = Arc::new(ForegroundMonitor::default());
    let sync = SessionSynchronizer::new(SyncConfig::default(), monitor);
    let client = Arc::new(MockAuthClient::new());
    sync.bind(client.clone());

    assert!(!sync.timer_active());
    advance(Duration::from_secs(3600)).await;
    assert_eq!(client.refetch_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_means_no_timer() {
    let (sync, client, _monitor) = bound(0, true);

    assert!(!sync.timer_active());
    advance(Duration::from_secs(600)).await;
    assert_eq!(client.refetch_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timer_fires_every_interval_while_foreground() {
    let (sync, client, _monitor) = bound(30_000, true);
    assert!(sync.timer_active());

    advance(Duration::from_secs(29)).await;
    assert_eq!(client.refetch_calls(), 0);

    advance(Duration::from_secs(2)).await;
    assert_eq!(client.refetch_calls(), 1);

    advance(Duration::from_secs(60)).await;
    assert_eq!(client.refetch_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refetch_leaves_state_untouched() {
    let (sync, client, _monitor) = bound(1_000, true);
    client.emit(AuthEvent::StatusChanged {
        status: Status::Authenticated,
    });
    settle().await;
    let before = sync.state();

    client.fail_refetch(true);
    advance(Duration::from_millis(3_500)).await;

    assert_eq!(client.refetch_calls(), 3);
    assert_eq!(sync.state(), before);
    assert!(sync.timer_active());
}

#[tokio::test(start_paused = true)]
async fn test_refetch_result_reaches_state_through_events() {
    let (sync, client, _monitor) = bound(1_000, true);
    client.emit_on_refetch(AuthEvent::SessionChanged {
        session: Some("fresh".to_string()),
    });

    advance(Duration::from_millis(1_100)).await;

    assert_eq!(sync.state().session.as_deref(), Some("fresh"));
}

// =============================================================================
// Foreground transitions
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_background_stops_timer() {
    let (sync, client, monitor) = bound(10_000, true);

    monitor.handle(LifecycleSignal::Paused);
    settle().await;

    assert!(!sync.timer_active());
    advance(Duration::from_secs(120)).await;
    assert_eq!(client.refetch_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_refetches_once_and_restarts_timer() {
    let (sync, client, monitor) = bound(10_000, true);

    monitor.handle(LifecycleSignal::Hidden);
    settle().await;
    monitor.handle(LifecycleSignal::Resumed);
    settle().await;

    assert_eq!(client.refetch_calls(), 1);
    assert!(sync.timer_active());

    advance(Duration::from_millis(10_500)).await;
    assert_eq!(client.refetch_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_background_signals_are_coalesced() {
    let (sync, client, monitor) = bound(10_000, true);

    monitor.handle(LifecycleSignal::Inactive);
    monitor.handle(LifecycleSignal::Paused);
    monitor.handle(LifecycleSignal::Hidden);
    settle().await;
    monitor.handle(LifecycleSignal::Resumed);
    monitor.handle(LifecycleSignal::Resumed);
    settle().await;

    assert!(sync.timer_active());
    assert_eq!(client.refetch_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_without_refetch_on_foreground_only_restarts_timer() {
    let (sync, client, monitor) = bound(10_000, false);

    monitor.handle(LifecycleSignal::Paused);
    settle().await;
    monitor.handle(LifecycleSignal::Resumed);
    settle().await;

    assert_eq!(client.refetch_calls(), 0);
    assert!(sync.timer_active());

    advance(Duration::from_millis(10_500)).await;
    assert_eq!(client.refetch_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_refetch_without_interval() {
    let (sync, client, monitor) = bound(0, true);

    monitor.handle(LifecycleSignal::Paused);
    settle().await;
    monitor.handle(LifecycleSignal::Resumed);
    settle().await;

    assert_eq!(client.refetch_calls(), 1);
    assert!(!sync.timer_active());
}

#[tokio::test(start_paused = true)]
async fn test_detached_signal_changes_nothing() {
    let (sync, client, monitor) = bound(10_000, true);

    assert_eq!(monitor.handle(LifecycleSignal::Detached), None);
    settle().await;

    assert!(sync.timer_active());
    assert_eq!(client.refetch_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tick_while_backgrounded_is_skipped() {
    let foreground = Arc::new(ManualForeground::new());
    let config = SyncConfig::default().with_refetch_interval_ms(1_000);
    let sync = SessionSynchronizer::new(config, foreground.clone());
    let client = Arc::new(MockAuthClient::new());
    sync.bind(client.clone());

    // The timer was not told about the transition, so it keeps ticking.
    foreground.set_quietly(Visibility::Background);
    advance(Duration::from_millis(3_500)).await;

    assert!(sync.timer_active());
    assert_eq!(client.refetch_calls(), 0);

    assert!(sync.refetch_now());
    settle().await;
    assert_eq!(client.refetch_calls(), 0);

    foreground.set_quietly(Visibility::Foreground);
    assert!(sync.refetch_now());
    settle().await;
    assert_eq!(client.refetch_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bind_while_backgrounded_arms_timer_but_skips_ticks() {
    let monitor = Arc::new(ForegroundMonitor::new(Visibility::Background));
    let config = SyncConfig::default().with_refetch_interval_ms(1_000);
    let sync = SessionSynchronizer::new(config, monitor.clone());
    let client = Arc::new(MockAuthClient::new());
    sync.bind(client.clone());

    assert!(sync.timer_active());
    advance(Duration::from_millis(2_500)).await;
    assert_eq!(client.refetch_calls(), 0);

    monitor.handle(LifecycleSignal::Resumed);
    settle().await;
    assert_eq!(client.refetch_calls(), 1);
}

// =============================================================================
// Rebinding
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_rebind_leaves_exactly_one_timer() {
    let (sync, first, monitor) = bound(10_000, true);
    let second = Arc::new(MockAuthClient::new());

    advance(Duration::from_secs(5)).await;
    sync.bind(second.clone());

    advance(Duration::from_millis(10_500)).await;
    assert_eq!(first.refetch_calls(), 0);
    assert_eq!(second.refetch_calls(), 1);

    // Only the live binding reacts to foreground transitions.
    monitor.handle(LifecycleSignal::Paused);
    settle().await;
    monitor.handle(LifecycleSignal::Resumed);
    settle().await;
    assert_eq!(first.refetch_calls(), 0);
    assert_eq!(second.refetch_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_stops_refetching() {
    let (sync, client, monitor) = bound(1_000, true);

    sync.dispose();
    advance(Duration::from_secs(10)).await;
    monitor.handle(LifecycleSignal::Paused);
    settle().await;
    monitor.handle(LifecycleSignal::Resumed);
    settle().await;

    assert_eq!(client.refetch_calls(), 0);
    assert!(!sync.refetch_now());
}
