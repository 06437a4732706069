//! Capacity thresholds refuse admission.

use crate::support::TestContext;
use quotagate::{names, IntakeAction};

/// In-flight above the intake threshold: nothing moves, whatever is waiting.
#[tokio::test]
async fn saturated_in_flight_skips_all_admission() {
    let ctx = TestContext::new();
    ctx.params.set(names::INTAKE_MAX_IN_FLIGHT, "10");
    ctx.params.set(names::BATCH_SIZE, "5");
    ctx.set_counter(11).await;
    for i in 0..20 {
        ctx.put_item(&format!("intake/batch/doc-{i:02}.pdf"));
    }

    let report = ctx.scheduler().run_once().await;
    assert_eq!(report.action, IntakeAction::Skipped);
    assert_eq!(report.admitted(), 0);
    assert_eq!(report.in_flight, 11);
    assert!(report.reason.unwrap().contains("above threshold"));
    assert_eq!(ctx.objects.keys_under("intake/").len(), 20);
    assert!(ctx.objects.keys_under("processing/").is_empty());
}

#[tokio::test]
async fn saturated_pipelines_skip_admission() {
    let ctx = TestContext::new();
    ctx.orchestrator.set_pipelines(12);
    ctx.put_item("intake/doc.pdf");

    let report = ctx.scheduler().run_once().await;
    assert_eq!(report.action, IntakeAction::Skipped);
    assert_eq!(report.running_pipelines, Some(12));
    assert!(ctx.objects.contains("intake/doc.pdf"));
}

/// Just under the threshold the scheduler admits again.
#[tokio::test]
async fn below_threshold_admits() {
    let ctx = TestContext::new();
    ctx.params.set(names::INTAKE_MAX_IN_FLIGHT, "10");
    ctx.set_counter(9).await;
    ctx.put_item("intake/doc.pdf");

    let report = ctx.scheduler().run_once().await;
    assert_eq!(report.action, IntakeAction::Admitted);
    assert!(ctx.objects.contains("processing/doc.pdf"));
}

#[tokio::test]
async fn empty_areas_report_no_files() {
    let ctx = TestContext::new();
    let report = ctx.scheduler().run_once().await;
    assert_eq!(report.action, IntakeAction::NoFiles);
    assert_eq!(report.remaining, 0);
}
