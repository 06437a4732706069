//! Error types for the rate gate.

use quotagate_store::StoreError;
use std::time::Duration;

/// Errors that can occur when acquiring a slot.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GateError {
    /// No slot could be acquired within the caller's wait budget.
    ///
    /// The caller must treat this as failure and not make the API call.
    #[error("timed out acquiring a slot for {api_type} after {waited:?}")]
    AcquireTimeout {
        /// API type label of the attempted call.
        api_type: String,
        /// Total time spent waiting.
        waited: Duration,
    },
    /// The counter store failed in a way the gate could not absorb.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GateError {
    /// Returns true for [`GateError::AcquireTimeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, GateError::AcquireTimeout { .. })
    }
}
