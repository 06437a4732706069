//! Error types for the counter store.

/// Errors from counter store operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A conditional update's precondition did not hold.
    #[error("conditional update failed")]
    ConditionFailed,
    /// A transient backend failure; safe to retry.
    #[error("transient store error: {message}")]
    Transient {
        /// Backend-supplied detail.
        message: String,
    },
    /// A non-retryable failure (malformed key, bad precondition, ...).
    #[error("fatal store error: {message}")]
    Fatal {
        /// Backend-supplied detail.
        message: String,
    },
}

impl StoreError {
    /// Returns true for [`StoreError::ConditionFailed`].
    pub fn is_condition_failed(&self) -> bool {
        matches!(self, StoreError::ConditionFailed)
    }

    /// Returns true for [`StoreError::Transient`].
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient { .. })
    }
}

/// Result type for counter store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
