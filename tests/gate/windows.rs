//! Minute-boundary and zero-wait behavior.

use crate::support::TestContext;
use chrono::{DateTime, Duration as ChronoDuration};
use quotagate::rows::RpmWindowRow;
use quotagate::{Clock, CounterStore, GateConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn window_count(ctx: &TestContext, key: &str) -> i64 {
    ctx.store
        .get(key)
        .await
        .unwrap()
        .map(|fields| RpmWindowRow::from_fields(&fields).request_count)
        .unwrap_or(0)
}

/// An acquisition in the last second of a minute charges that minute, not
/// the next one.
#[tokio::test]
async fn last_second_charges_the_current_minute() {
    let ctx = TestContext::new();
    ctx.set_limits("10", "3");
    let gate = ctx.gate();

    ctx.clock
        .set(DateTime::UNIX_EPOCH + ChronoDuration::seconds(59));
    let guard = gate.acquire("autotag", None).await.unwrap();
    guard.release().await;

    assert_eq!(window_count(&ctx, "rpm_window_combined_197001010000").await, 1);
    assert_eq!(window_count(&ctx, "rpm_window_combined_197001010001").await, 0);

    // One second later the next window starts from scratch.
    ctx.clock
        .set(DateTime::UNIX_EPOCH + ChronoDuration::seconds(60));
    let guard = gate.acquire("autotag", None).await.unwrap();
    guard.release().await;

    assert_eq!(window_count(&ctx, "rpm_window_combined_197001010000").await, 1);
    assert_eq!(window_count(&ctx, "rpm_window_combined_197001010001").await, 1);
}

/// The minute budget is global across API types.
#[tokio::test]
async fn window_is_shared_across_api_types() {
    let ctx = TestContext::new();
    ctx.set_limits("10", "2");
    let gate = ctx.gate();

    let a = gate.acquire("autotag", None).await.unwrap();
    let b = gate.acquire("extract", None).await.unwrap();

    let c = gate
        .acquire_with_wait("autotag", None, Duration::ZERO)
        .await;
    assert!(c.unwrap_err().is_timeout());

    a.release().await;
    b.release().await;
}

/// With no wait budget, acquire makes exactly one attempt.
#[tokio::test]
async fn zero_wait_is_single_shot() {
    let ctx = TestContext::new();
    ctx.set_limits("1", "100");

    let timeouts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&timeouts);
    let config = GateConfig::builder()
        .initial_jitter(false)
        .on_acquire_timeout(move |_waited| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let gate = ctx.gate_with(config);

    // Free gate: immediate success.
    let before = ctx.clock.unix_seconds();
    let guard = gate
        .acquire_with_wait("autotag", None, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(ctx.clock.unix_seconds(), before, "no sleeping on success");

    // Saturated gate: immediate, single-attempt timeout.
    let err = gate
        .acquire_with_wait("autotag", None, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(ctx.clock.unix_seconds(), before, "no sleeping on timeout");
    assert_eq!(timeouts.load(Ordering::SeqCst), 1);

    guard.release().await;
}

/// Window rows expire on their TTL so dead minutes do not accumulate.
#[tokio::test]
async fn spent_windows_expire() {
    let ctx = TestContext::new();
    ctx.set_limits("10", "3");
    let gate = ctx.gate();

    let guard = gate.acquire("autotag", None).await.unwrap();
    guard.release().await;
    assert_eq!(window_count(&ctx, "rpm_window_combined_197001010000").await, 1);

    ctx.clock.advance(Duration::from_secs(121));
    assert_eq!(window_count(&ctx, "rpm_window_combined_197001010000").await, 0);
}
