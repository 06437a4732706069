//! The counter store contract.

use crate::error::StoreError;
use crate::ops::{Fields, Mutation, Precondition};
use async_trait::async_trait;

/// Transactional key-value store with atomic conditional updates, TTL-based
/// expiry, and scan-by-prefix.
///
/// Every quotagate component is written against this trait alone. The
/// backend must serialize `update` calls per key: between concurrent
/// conditional updates, the observable order of successful mutations is the
/// store's serialization order.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Reads a row. Returns `None` for missing or TTL-expired rows.
    async fn get(&self, key: &str) -> Result<Option<Fields>, StoreError>;

    /// Unconditionally writes a row, replacing any existing fields.
    async fn put(&self, key: &str, fields: Fields) -> Result<(), StoreError>;

    /// Atomically applies `mutations` to a row, creating it if absent.
    ///
    /// When `precondition` is given it is evaluated against the row's
    /// current fields (a missing row evaluates as empty); if it does not
    /// hold, the row is untouched and [`StoreError::ConditionFailed`] is
    /// returned. On success, returns the row's new fields.
    async fn update(
        &self,
        key: &str,
        mutations: &[Mutation],
        precondition: Option<&Precondition>,
    ) -> Result<Fields, StoreError>;

    /// Deletes a row. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Returns all live rows whose key starts with `prefix`, in key order.
    /// TTL-expired rows are filtered out.
    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Fields)>, StoreError>;
}
