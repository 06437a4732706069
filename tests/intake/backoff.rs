//! The global backoff marker is honored.

use crate::support::TestContext;
use quotagate::{Clock, IntakeAction};
use std::time::Duration;

#[tokio::test]
async fn active_backoff_skips_with_remaining_seconds() {
    let ctx = TestContext::new();
    ctx.set_backoff_until(ctx.clock.unix_seconds() + 30).await;
    ctx.put_item("intake/doc.pdf");

    let report = ctx.scheduler().run_once().await;
    assert_eq!(report.action, IntakeAction::Skipped);
    assert_eq!(report.admitted(), 0);
    let reason = report.reason.unwrap();
    assert!(reason.contains("backoff"), "reason was: {reason}");
    assert!(reason.contains("30s remaining"), "reason was: {reason}");
    assert!(ctx.objects.contains("intake/doc.pdf"));
}

#[tokio::test]
async fn backoff_expiry_reopens_admission() {
    let ctx = TestContext::new();
    ctx.set_backoff_until(ctx.clock.unix_seconds() + 30).await;
    ctx.put_item("intake/doc.pdf");

    assert_eq!(
        ctx.scheduler().run_once().await.action,
        IntakeAction::Skipped
    );

    ctx.clock.advance(Duration::from_secs(31));
    let report = ctx.scheduler().run_once().await;
    assert_eq!(report.action, IntakeAction::Admitted);
    assert!(ctx.objects.contains("processing/doc.pdf"));
}
