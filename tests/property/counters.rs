//! Counter bounds hold under arbitrary operation interleavings.

use proptest::prelude::*;
use quotagate::rows::fields as f;
use quotagate::rows::InFlightRow;
use quotagate::{keys, Clock, CounterStore, ManualClock, MemoryCounterStore, Mutation, Precondition};
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, Copy)]
enum Op {
    Acquire,
    Release,
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![Just(Op::Acquire), Just(Op::Release)],
        0..120,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: whatever the interleaving of bounded increments and
    /// unconditional releases, the counter stays within `[0, cap]`.
    #[test]
    fn in_flight_counter_stays_in_bounds(cap in 1i64..=10, script in ops()) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
            let store = MemoryCounterStore::new(clock);
            let guard = Precondition::absent_or_less_than(f::IN_FLIGHT, cap);

            for op in script {
                let result = match op {
                    Op::Acquire => store
                        .update(
                            keys::IN_FLIGHT_KEY,
                            &[Mutation::add(f::IN_FLIGHT, 1, 0)],
                            Some(&guard),
                        )
                        .await,
                    Op::Release => store
                        .update(
                            keys::IN_FLIGHT_KEY,
                            &[Mutation::add(f::IN_FLIGHT, -1, 1)],
                            None,
                        )
                        .await,
                };

                let value = match result {
                    Ok(fields) => InFlightRow::from_fields(&fields).in_flight,
                    Err(_) => {
                        let fields = store.get(keys::IN_FLIGHT_KEY).await.unwrap().unwrap();
                        InFlightRow::from_fields(&fields).in_flight
                    }
                };
                prop_assert!((0..=cap).contains(&value), "counter {value} left [0, {cap}]");
            }
            Ok(())
        })?;
    }

    /// Property: a window's request count is monotone non-decreasing for
    /// its lifetime and never passes the cap under guarded increments.
    #[test]
    fn window_count_is_monotone_and_capped(cap in 1i64..=20, attempts in 1usize..=60) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
            let store = MemoryCounterStore::new(Arc::clone(&clock));
            let key = "rpm_window_combined_197001010000";
            let guard = Precondition::absent_or_less_than(f::REQUEST_COUNT, cap);

            let mut last = 0;
            for _ in 0..attempts {
                let result = store
                    .update(
                        key,
                        &[
                            Mutation::add(f::REQUEST_COUNT, 1, 0),
                            Mutation::set(f::TTL, 120),
                        ],
                        Some(&guard),
                    )
                    .await;
                if let Ok(fields) = result {
                    let count = fields.get(f::REQUEST_COUNT).and_then(|v| v.as_i64()).unwrap();
                    prop_assert!(count > last, "count went backwards: {last} -> {count}");
                    prop_assert!(count <= cap);
                    last = count;
                }
            }
            prop_assert_eq!(last, cap.min(attempts as i64));
            Ok(())
        })?;
    }
}
