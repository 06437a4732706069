//! Intake scheduling: capacity-aware admission of work items.
//!
//! The scheduler is a single-threaded control loop invoked periodically by an
//! external timer. Each invocation looks at live capacity signals (the
//! in-flight counter, the orchestrator's running-pipeline count, the global
//! backoff marker) and admits a bounded batch of items from the retry and
//! intake areas into the processing area. Throttling at the entry point
//! keeps the rate gate out of its wait state for most traffic.

mod scheduler;

pub use scheduler::{IntakeAction, IntakeReport, IntakeScheduler};
