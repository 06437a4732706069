//! The full admit/fail cycle up to dead-letter.

use crate::support::TestContext;
use quotagate::keys;
use quotagate::{CounterStore, FailureAction, IntakeAction, ObjectStore, PipelineFailure};
use std::time::Duration;

fn failure_for(item_path: &str, attempt: usize) -> PipelineFailure {
    PipelineFailure {
        execution_id: format!("exec-{attempt}"),
        item_path: item_path.to_string(),
        raw_cause: "States.Timeout".to_string(),
        status: "FAILED".to_string(),
    }
}

/// Four failures with a budget of three: three trips through the retry
/// area with counts 1, 2, 3, then dead-letter with count 4, one failure
/// record per attempt, and exactly one copy of the item at every pause.
#[tokio::test]
async fn item_climbs_the_ladder_into_dead_letter() {
    let ctx = TestContext::new();
    ctx.params.set("max-retries", "3");
    ctx.params.set("batch-size-low", "1");
    let scheduler = ctx.scheduler();
    let controller = ctx.failure_controller();

    ctx.put_item("intake/a/X.pdf");

    for attempt in 1..=4 {
        // Admission pulls the item into the processing area.
        let report = scheduler.run_once().await;
        assert_eq!(report.action, IntakeAction::Admitted, "attempt {attempt}");
        assert!(ctx.objects.contains("processing/a/X.pdf"));
        assert_eq!(item_copies(&ctx), 1);

        // The pipeline fails terminally.
        let outcome = controller
            .handle(&failure_for("processing/a/X.pdf", attempt))
            .await
            .unwrap();
        assert_eq!(outcome.retry_count, attempt as i64);

        if attempt <= 3 {
            assert_eq!(outcome.action, FailureAction::MovedToRetry);
            let attrs = ctx.objects.attributes("retry/a/X.pdf").await.unwrap();
            assert_eq!(attrs.get("retry-count").unwrap(), &attempt.to_string());
        } else {
            assert_eq!(outcome.action, FailureAction::MovedToDeadLetter);
            let attrs = ctx.objects.attributes("dead-letter/a/X.pdf").await.unwrap();
            assert_eq!(attrs.get("retry-count").unwrap(), "4");
            assert_eq!(attrs.get("max-retries-exceeded").unwrap(), "true");
        }
        assert_eq!(item_copies(&ctx), 1);

        // Space the attempts out so listings stay deterministic.
        ctx.clock.advance(Duration::from_secs(60));
    }

    // Exactly four failure records were written.
    let records = ctx
        .store
        .scan(keys::FAILURE_RECORD_PREFIX)
        .await
        .unwrap();
    assert_eq!(records.len(), 4);
}

fn item_copies(ctx: &TestContext) -> usize {
    ["intake/", "retry/", "processing/", "dead-letter/"]
        .iter()
        .map(|prefix| {
            ctx.objects
                .keys_under(prefix)
                .iter()
                .filter(|key| key.ends_with("X.pdf"))
                .count()
        })
        .sum()
}

/// Dead-letter routing triggers exactly when the stored count has reached
/// the budget.
#[tokio::test]
async fn dead_letter_iff_budget_spent() {
    let ctx = TestContext::new();
    ctx.params.set("max-retries", "3");
    let controller = ctx.failure_controller();

    ctx.put_item_with_retry_count("processing/under.pdf", 2);
    let outcome = controller
        .handle(&failure_for("processing/under.pdf", 1))
        .await
        .unwrap();
    assert_eq!(outcome.action, FailureAction::MovedToRetry);

    ctx.put_item_with_retry_count("processing/spent.pdf", 3);
    let outcome = controller
        .handle(&failure_for("processing/spent.pdf", 2))
        .await
        .unwrap();
    assert_eq!(outcome.action, FailureAction::MovedToDeadLetter);
}

/// A failed move leaves the item in the processing area and tags the
/// outcome instead of erroring.
#[tokio::test]
async fn move_failure_is_an_outcome_not_an_error() {
    let ctx = TestContext::new();
    ctx.put_item("processing/doc.pdf");
    ctx.objects.fail_copies_to(Some("retry/"));

    let outcome = ctx
        .failure_controller()
        .handle(&failure_for("processing/doc.pdf", 1))
        .await
        .unwrap();
    assert_eq!(outcome.action, FailureAction::MoveFailed);
    assert!(ctx.objects.contains("processing/doc.pdf"));
    assert!(ctx.objects.keys_under("retry/").is_empty());

    // The failure was still recorded.
    let records = ctx.store.scan(keys::FAILURE_RECORD_PREFIX).await.unwrap();
    assert_eq!(records.len(), 1);
}

/// Scratch artifacts are removed on every failure.
#[tokio::test]
async fn working_area_is_cleaned() {
    let ctx = TestContext::new();
    ctx.put_item("processing/a/doc.pdf");
    ctx.put_item("working/a/doc/chunk_001.pdf");
    ctx.put_item("working/a/doc/chunk_002.pdf");
    ctx.put_item("working/other/keep.pdf");

    let outcome = ctx
        .failure_controller()
        .handle(&failure_for("processing/a/doc.pdf", 1))
        .await
        .unwrap();
    assert_eq!(outcome.working_objects_deleted, 2);
    assert!(ctx.objects.keys_under("working/a/doc/").is_empty());
    assert!(ctx.objects.contains("working/other/keep.pdf"));
}
