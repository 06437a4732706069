//! Property test organization.

pub mod batching;
pub mod counters;
pub mod reason;
