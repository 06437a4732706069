//! Intake test organization:
//! - throttle.rs: capacity thresholds refuse admission
//! - backoff.rs: the global backoff marker is honored
//! - batching.rs: batch bounds and ordering

mod backoff;
mod throttle;
