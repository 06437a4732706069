//! Dual-limit rate gate for outbound API calls.
//!
//! The gate stands between workers and an externally metered API with a hard
//! global quota. Every outbound call first acquires a slot against two
//! coupled limits held in the shared counter store:
//!
//! 1. an **in-flight cap**: concurrent outstanding calls across all workers,
//! 2. a **per-minute request cap**: calls started in the current UTC minute,
//!    global across API types.
//!
//! Acquisition is a two-phase conditional increment: the in-flight slot is
//! taken first (those are the more abundant resource), then the minute
//! window. If the window is exhausted, the in-flight slot is handed back and
//! the caller waits for the next minute. A successful acquisition is returned
//! as a [`SlotGuard`] that releases the slot on every exit path.
//!
//! ```no_run
//! # use quotagate_gate::{RateGate, GateError};
//! # async fn example(gate: &RateGate) -> Result<(), GateError> {
//! let guard = gate.acquire("autotag", Some("reports/q3.pdf")).await?;
//! // ... make the outbound API call ...
//! guard.release().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod events;
mod gate;
mod jitter;
mod registry;

#[cfg(feature = "layer")]
mod layer;

pub use config::{GateConfig, GateConfigBuilder};
pub use error::GateError;
pub use events::{LimitKind, RateGateEvent};
pub use gate::{GateUsage, RateGate, SlotGuard};
pub use jitter::Jitter;
pub use registry::InFlightRegistry;

#[cfg(feature = "layer")]
pub use layer::{CallLabel, RateGateLayer, RateGateService};
