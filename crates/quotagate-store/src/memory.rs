//! In-memory counter store.

use crate::error::StoreError;
use crate::ops::{apply_mutations, Fields, Mutation, Precondition};
use crate::rows::fields as f;
use crate::store::CounterStore;
use async_trait::async_trait;
use quotagate_core::Clock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory [`CounterStore`] used by tests and single-node deployments.
///
/// All operations run under a single mutex, which makes conditional updates
/// the linearization point the components rely on. Rows with a `ttl` field
/// older than the injected clock are treated as absent on read and removed
/// lazily, matching the best-effort expiry of a hosted KV table.
#[derive(Clone)]
pub struct MemoryCounterStore {
    rows: Arc<Mutex<BTreeMap<String, Fields>>>,
    clock: Arc<dyn Clock>,
    fail_next_updates: Arc<AtomicU32>,
}

impl MemoryCounterStore {
    /// Creates an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(BTreeMap::new())),
            clock,
            fail_next_updates: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Makes the next `n` `update` calls fail with a transient error.
    pub fn fail_next_updates(&self, n: u32) {
        self.fail_next_updates.store(n, Ordering::SeqCst);
    }

    fn expired(&self, fields: &Fields) -> bool {
        match fields.get(f::TTL).and_then(Value::as_i64) {
            Some(ttl) => ttl <= self.clock.unix_seconds(),
            None => false,
        }
    }

    fn take_injected_failure(&self) -> bool {
        self.fail_next_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<Fields>, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(fields) = rows.get(key) {
            if self.expired(fields) {
                rows.remove(key);
                return Ok(None);
            }
            return Ok(Some(fields.clone()));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, fields: Fields) -> Result<(), StoreError> {
        self.rows.lock().unwrap().insert(key.to_string(), fields);
        Ok(())
    }

    async fn update(
        &self,
        key: &str,
        mutations: &[Mutation],
        precondition: Option<&Precondition>,
    ) -> Result<Fields, StoreError> {
        if self.take_injected_failure() {
            return Err(StoreError::Transient {
                message: "injected failure".to_string(),
            });
        }

        let mut rows = self.rows.lock().unwrap();
        let mut fields = match rows.get(key) {
            Some(existing) if !self.expired(existing) => existing.clone(),
            _ => Fields::new(),
        };

        if let Some(precondition) = precondition {
            if !precondition.holds(&fields) {
                return Err(StoreError::ConditionFailed);
            }
        }

        apply_mutations(&mut fields, mutations)?;
        rows.insert(key.to_string(), fields.clone());
        Ok(fields)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.rows.lock().unwrap().remove(key);
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Fields)>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|(key, fields)| key.starts_with(prefix) && !self.expired(fields))
            .map(|(key, fields)| (key.clone(), fields.clone()))
            .collect())
    }
}
