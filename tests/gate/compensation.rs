//! Phase B failure hands the Phase A slot back.

use crate::support::TestContext;
use quotagate::{Clock, GateConfig, LimitKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Two concurrent acquires against `max_in_flight = 10`, `max_rpm = 1`:
/// both win an in-flight slot, only one wins the minute window, and the
/// loser's compensation leaves exactly the winner's slot behind.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rpm_loser_compensates_in_flight_slot() {
    let ctx = TestContext::new();
    ctx.set_limits("10", "1");

    let rpm_hits = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&rpm_hits);
    let config = GateConfig::builder()
        .initial_jitter(false)
        .on_limit_hit(move |limit, _observed, _max| {
            if limit == LimitKind::RequestsPerMinute {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();
    let gate = ctx.gate_with(config);

    let mut successes = 0;
    let mut timeouts = 0;
    let mut handles = Vec::new();
    for _ in 0..2 {
        let gate = gate.clone();
        handles.push(tokio::spawn(async move {
            gate.acquire_with_wait("autotag", None, Duration::ZERO)
                .await
                .map(std::mem::forget)
        }));
    }
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(err) => {
                assert!(err.is_timeout());
                timeouts += 1;
            }
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(timeouts, 1);
    assert_eq!(rpm_hits.load(Ordering::SeqCst), 1);
    // Only the winner's slot remains.
    assert_eq!(ctx.in_flight().await, 1);
}

/// The compensated attempt succeeds once the next minute window opens.
#[tokio::test]
async fn compensated_attempt_recovers_next_minute() {
    let ctx = TestContext::new();
    ctx.set_limits("10", "1");
    let gate = ctx.gate();

    let winner = gate.acquire("autotag", None).await.unwrap();

    let late = gate
        .acquire_with_wait("extract", None, Duration::from_secs(120))
        .await
        .unwrap();
    assert!(ctx.clock.unix_seconds() >= 60);
    assert_eq!(ctx.in_flight().await, 2);

    winner.release().await;
    late.release().await;
    assert_eq!(ctx.in_flight().await, 0);
}
