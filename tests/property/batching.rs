//! Admission never exceeds its batch.

use crate::support::TestContext;
use proptest::prelude::*;
use quotagate::names;
use tokio::runtime::Runtime;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: one invocation admits at most the configured batch, and
    /// every admitted item lands in the processing area exactly once.
    #[test]
    fn admission_is_batch_bounded(
        retry_items in 0usize..=12,
        intake_items in 0usize..=12,
        batch in 1usize..=8,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = TestContext::new();
            let batch_str = batch.to_string();
            ctx.params.set(names::BATCH_SIZE, &batch_str);
            ctx.params.set(names::BATCH_SIZE_LOW, &batch_str);

            for i in 0..retry_items {
                ctx.put_item(&format!("retry/r-{i:02}.pdf"));
            }
            for i in 0..intake_items {
                ctx.put_item(&format!("intake/i-{i:02}.pdf"));
            }

            let report = ctx.scheduler().run_once().await;
            let admitted = report.admitted();
            let total = retry_items + intake_items;

            prop_assert!(admitted <= batch, "admitted {admitted} > batch {batch}");
            prop_assert_eq!(admitted, batch.min(total));
            prop_assert_eq!(report.remaining, total - admitted);
            prop_assert_eq!(ctx.objects.keys_under("processing/").len(), admitted);

            // Retry items always fill the batch first.
            prop_assert_eq!(report.admitted_retry, batch.min(retry_items));
            Ok(())
        })?;
    }
}
