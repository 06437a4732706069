//! Counter reconciliation.
//!
//! Workers that crash mid-call never release their in-flight slots, so the
//! counter slowly drifts above reality and eventually starves admission. The
//! reconciler is a periodic control loop that compares the counter against
//! the per-call tracking rows and the orchestrator's live counts, resets the
//! counter when it is clearly stuck, and reaps tracking rows old enough that
//! their worker must be gone.
//!
//! The rate gate's compensation path deliberately tolerates failed
//! decrements, so running this loop is not optional in a deployment; it is
//! the other half of that design.

mod reconciler;

pub use reconciler::{ReconcileAction, ReconcileReport, Reconciler};
