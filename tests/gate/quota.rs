//! Both limits hold under heavy contention.

use crate::support::TestContext;
use quotagate::{Clock, GateConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ten workers against `max_in_flight = 2`, `max_rpm = 3`: everyone gets
/// through eventually, no acquisition ever observes more than 2 in flight,
/// and 10 grants at 3 per minute force the run across at least four minute
/// windows.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn quota_respected_under_contention() {
    let ctx = TestContext::new();
    ctx.set_limits("2", "3");

    let in_flight_at_acquire = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&in_flight_at_acquire);
    let config = GateConfig::builder()
        .initial_jitter(false)
        .max_wait(Duration::from_secs(36_000))
        .on_slot_acquired(move |in_flight, _waited| {
            seen.lock().unwrap().push(in_flight);
        })
        .build();
    let gate = ctx.gate_with(config);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let gate = gate.clone();
        let clock = ctx.clock.clone();
        handles.push(tokio::spawn(async move {
            let guard = gate.acquire("autotag", None).await.unwrap();
            clock.sleep(Duration::from_secs(1)).await;
            guard.release().await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let in_flight = in_flight_at_acquire.lock().unwrap();
    assert_eq!(in_flight.len(), 10, "all ten acquisitions must succeed");
    assert!(
        in_flight.iter().all(|&n| n >= 1 && n <= 2),
        "in-flight exceeded its cap: {in_flight:?}"
    );

    // The store's conditional update caps every minute window at 3 starts,
    // so ten grants need at least the fourth window: three full minute
    // boundaries must have passed.
    assert!(
        ctx.clock.unix_seconds() >= 180,
        "ten grants at 3/min finished too fast: clock at {}s",
        ctx.clock.unix_seconds()
    );
    assert_eq!(ctx.in_flight().await, 0);
}

/// With one free slot, exactly one of the concurrent racers wins it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_free_slot_admits_exactly_one() {
    let ctx = TestContext::new();
    ctx.set_limits("2", "100");
    let gate = ctx.gate();

    let _held = gate.acquire("autotag", None).await.unwrap();

    let wins = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..5 {
        let gate = gate.clone();
        let wins = Arc::clone(&wins);
        handles.push(tokio::spawn(async move {
            if let Ok(guard) = gate
                .acquire_with_wait("autotag", None, Duration::ZERO)
                .await
            {
                wins.fetch_add(1, Ordering::SeqCst);
                // Hold the slot so later racers cannot reuse it.
                std::mem::forget(guard);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.in_flight().await, 2);
}
