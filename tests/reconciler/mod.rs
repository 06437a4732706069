//! Reconciler test organization:
//! - resets.rs: the decision ladder against real gate state
//! - stale.rs: crashed-worker rows are reaped

mod stale;
