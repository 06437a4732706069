//! Crashed-worker rows are reaped.

use crate::support::TestContext;
use quotagate::keys;
use quotagate::rows::FileTrackRow;
use quotagate::CounterStore;
use std::time::Duration;

/// A worker acquires with tracking, then dies without releasing. Its row
/// passes the stale threshold and gets marked; the counter drift is fixed
/// by the same pass.
#[tokio::test]
async fn dead_worker_slot_is_reclaimed() {
    let ctx = TestContext::new();
    ctx.set_limits("5", "100");
    let gate = ctx.gate();

    let guard = gate
        .acquire("autotag", Some("processing/doc.pdf"))
        .await
        .unwrap();
    // Simulate the crash: the slot is never released.
    std::mem::forget(guard);
    assert_eq!(ctx.in_flight().await, 1);

    // Sixteen minutes later, with the fleet idle, the reconciler runs.
    ctx.clock.advance(Duration::from_secs(16 * 60));
    let report = ctx.reconciler().run_once().await;

    assert_eq!(report.counter_after, 0);
    assert_eq!(report.stale_cleaned, 1);

    let rows = ctx.store.scan(keys::FILE_TRACK_PREFIX).await.unwrap();
    let row = FileTrackRow::from_fields(&rows[0].0, &rows[0].1);
    assert!(row.released);
    assert!(row.stale_cleanup);
}

/// Healthy in-progress calls are never reaped.
#[tokio::test]
async fn fresh_rows_survive_the_reaper() {
    let ctx = TestContext::new();
    ctx.set_limits("5", "100");
    ctx.orchestrator.set_workers(1);
    ctx.orchestrator.set_pipelines(1);
    let gate = ctx.gate();

    let guard = gate
        .acquire("autotag", Some("processing/doc.pdf"))
        .await
        .unwrap();

    ctx.clock.advance(Duration::from_secs(60));
    let report = ctx.reconciler().run_once().await;
    assert_eq!(report.stale_cleaned, 0);
    assert_eq!(report.tracked, 1);
    assert_eq!(ctx.in_flight().await, 1);

    guard.release().await;
}

/// The stale threshold is configurable.
#[tokio::test]
async fn stale_threshold_is_a_knob() {
    let ctx = TestContext::new();
    ctx.params.set("stale-entry-threshold", "2");
    ctx.orchestrator.set_workers(1);
    ctx.orchestrator.set_pipelines(1);

    let registry = ctx.gate().registry().clone();
    registry.track("doc.pdf", "autotag").await;

    ctx.clock.advance(Duration::from_secs(3 * 60));
    let report = ctx.reconciler().run_once().await;
    assert_eq!(report.stale_cleaned, 1);
}
