//! Failure handling: the retry ladder and terminal routing.
//!
//! When the orchestrator reports a terminal pipeline failure, the controller
//! reads the item's durable retry count, routes the item back to the retry
//! area or on to the dead-letter area, cleans up its scratch artifacts, and
//! writes a durable failure record for later digestion.

mod analyzer;
mod controller;
mod reason;

pub use analyzer::FailureAnalyzer;
pub use controller::{FailureAction, FailureController, FailureError, FailureOutcome};
pub use reason::normalize_failure_reason;
