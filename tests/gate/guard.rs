//! Release happens on every exit path.

use crate::support::TestContext;
use quotagate::keys;
use quotagate::rows::fields as f;
use quotagate::{CounterStore, Mutation};

#[tokio::test]
async fn explicit_release_returns_the_slot() {
    let ctx = TestContext::new();
    ctx.set_limits("5", "100");
    let gate = ctx.gate();

    let guard = gate.acquire("autotag", Some("processing/doc.pdf")).await.unwrap();
    assert_eq!(ctx.in_flight().await, 1);
    assert_eq!(gate.registry().active_count().await, 1);

    guard.release().await;
    assert_eq!(ctx.in_flight().await, 0);
    assert_eq!(gate.registry().active_count().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_worker_still_releases() {
    let ctx = TestContext::new();
    ctx.set_limits("5", "100");
    let gate = ctx.gate();

    let worker = {
        let gate = gate.clone();
        tokio::spawn(async move {
            let _guard = gate.acquire("autotag", None).await.unwrap();
            panic!("worker blew up mid-call");
        })
    };
    assert!(worker.await.is_err());

    // The drop-spawned release needs a tick to run.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert_eq!(ctx.in_flight().await, 0);
}

#[tokio::test]
async fn error_path_in_with_slot_releases() {
    let ctx = TestContext::new();
    ctx.set_limits("5", "100");
    let gate = ctx.gate();

    let result: Result<Result<(), &str>, _> = gate
        .with_slot("extract", None, async { Err::<(), _>("api rejected the call") })
        .await;
    assert!(result.unwrap().is_err());
    assert_eq!(ctx.in_flight().await, 0);
}

/// A stray duplicate decrement never drives the counter negative.
#[tokio::test]
async fn duplicate_release_clamps_at_zero() {
    let ctx = TestContext::new();
    ctx.set_limits("5", "100");
    let gate = ctx.gate();

    let guard = gate.acquire("autotag", None).await.unwrap();
    guard.release().await;
    assert_eq!(ctx.in_flight().await, 0);

    // Simulate a worker releasing a slot it no longer holds.
    ctx.store
        .update(
            keys::IN_FLIGHT_KEY,
            &[Mutation::add(f::IN_FLIGHT, -1, 1)],
            None,
        )
        .await
        .unwrap();
    assert_eq!(ctx.in_flight().await, 0);

    // The next acquisition starts from a clean counter.
    let guard = gate.acquire("autotag", None).await.unwrap();
    assert_eq!(ctx.in_flight().await, 1);
    guard.release().await;
}

#[tokio::test]
async fn release_survives_store_trouble() {
    let ctx = TestContext::new();
    ctx.set_limits("5", "100");
    let gate = ctx.gate();

    let guard = gate.acquire("autotag", None).await.unwrap();
    // The decrement fails; the release must swallow it rather than surface.
    ctx.store.fail_next_updates(1);
    guard.release().await;

    // Drift is left behind for the reconciler; nothing panicked or errored.
    assert_eq!(ctx.in_flight().await, 1);

    // The gate keeps working afterwards.
    let guard = gate.acquire("autotag", None).await.unwrap();
    guard.release().await;
    assert_eq!(ctx.in_flight().await, 1);
}
