//! Runtime tuning parameters.
//!
//! Limits, batch sizes, and enable flags are mutable operational knobs kept
//! in an external parameter service. Reads go through a per-process
//! read-through cache with a short TTL; a fetch failure falls back to the
//! knob's built-in default so a flaky parameter service can never stall
//! admission control.

mod cache;
mod source;
mod tuning;

pub use cache::CachedParameters;
pub use source::{ParamError, ParameterSource, StaticParameters};
pub use tuning::{names, Tuning};
