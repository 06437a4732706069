//! Per-call tracking rows.
//!
//! One row per active outbound call, written on acquisition and marked
//! `released` (never deleted) on release. The rows exist for observability
//! and for the reconciler's drift detection; the in-flight counter remains
//! the source of truth for admission, so every failure here is non-fatal.

use quotagate_core::Clock;
use quotagate_store::rows::{fields as f, FileTrackRow};
use quotagate_store::{keys, CounterStore, Fields, Mutation};
use serde_json::Value;
use std::sync::Arc;

/// Tracking rows auto-expire after an hour as a hard safety net.
const TRACK_ROW_TTL_SECS: i64 = 3600;

/// Registry of per-call tracking rows in the counter store.
#[derive(Clone)]
pub struct InFlightRegistry {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl InFlightRegistry {
    /// Creates a registry over the shared counter store.
    pub fn new(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Writes a tracking row for a call that just acquired a slot.
    ///
    /// The key carries a fresh random id so the same file can have several
    /// calls in flight at once.
    pub async fn track(&self, filename: &str, api_type: &str) {
        let base = keys::basename(filename);
        let id = uuid::Uuid::new_v4().simple().to_string();
        let key = keys::file_track_key(&id[..8], base);

        let mut fields = Fields::new();
        fields.insert(f::FILENAME.to_string(), Value::from(base));
        fields.insert(f::API_TYPE.to_string(), Value::from(api_type));
        fields.insert(
            f::STARTED_AT.to_string(),
            Value::from(self.clock.now().to_rfc3339()),
        );
        fields.insert(
            f::TTL.to_string(),
            Value::from(self.clock.unix_seconds() + TRACK_ROW_TTL_SECS),
        );

        if let Err(error) = self.store.put(&key, fields).await {
            tracing::warn!(%error, filename = base, api_type, "failed to track in-flight call");
        } else {
            tracing::debug!(filename = base, api_type, key, "tracked in-flight call");
        }
    }

    /// Marks the first unreleased row for `filename` + `api_type` as released.
    ///
    /// Logs and proceeds when no matching row exists (the row may have been
    /// reaped or its write may have failed).
    pub async fn untrack(&self, filename: &str, api_type: &str) {
        let base = keys::basename(filename);
        let rows = match self.store.scan(keys::FILE_TRACK_PREFIX).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(%error, filename = base, "failed to scan tracking rows");
                return;
            }
        };

        let matching = rows.iter().find(|(key, fields)| {
            let row = FileTrackRow::from_fields(key, fields);
            !row.released && row.filename == base && row.api_type == api_type
        });

        let Some((key, _)) = matching else {
            tracing::warn!(filename = base, api_type, "no tracking row found to release");
            return;
        };

        let mutations = [
            Mutation::set(f::RELEASED, true),
            Mutation::set(f::RELEASED_AT, self.clock.now().to_rfc3339()),
        ];
        if let Err(error) = self.store.update(key, &mutations, None).await {
            tracing::warn!(%error, key, "failed to mark tracking row released");
        }
    }

    /// All unreleased tracking rows, ordered by start time.
    pub async fn list_active(&self) -> Vec<FileTrackRow> {
        let rows = match self.store.scan(keys::FILE_TRACK_PREFIX).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(%error, "failed to list active tracking rows");
                return Vec::new();
            }
        };

        let mut active: Vec<FileTrackRow> = rows
            .iter()
            .map(|(key, fields)| FileTrackRow::from_fields(key, fields))
            .filter(|row| !row.released)
            .collect();
        active.sort_by_key(|row| row.started_at);
        active
    }

    /// Number of unreleased tracking rows.
    pub async fn active_count(&self) -> usize {
        self.list_active().await.len()
    }
}
