//! The failure controller.

use crate::analyzer::FailureAnalyzer;
use crate::reason::normalize_failure_reason;
use quotagate_core::area::{working_prefix_for, MAX_RETRIES_EXCEEDED_ATTR, RETRY_COUNT_ATTR};
use quotagate_core::{Area, Clock, ObjectStore, PipelineFailure};
use quotagate_params::Tuning;
use quotagate_store::rows::fields as f;
use quotagate_store::{keys, CounterStore, Fields};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Where a failed item was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// The item went back to the retry area for another attempt.
    MovedToRetry,
    /// The item's retry budget is exhausted; it went to the dead-letter area.
    MovedToDeadLetter,
    /// The move failed; the item was left where it was.
    MoveFailed,
}

impl FailureAction {
    /// Stable tag used in failure records.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureAction::MovedToRetry => "MOVED_TO_RETRY",
            FailureAction::MovedToDeadLetter => "MOVED_TO_DEAD_LETTER",
            FailureAction::MoveFailed => "MOVE_FAILED",
        }
    }
}

/// Outcome of handling one pipeline failure.
#[derive(Debug, Clone)]
pub struct FailureOutcome {
    /// Where the item was routed.
    pub action: FailureAction,
    /// The item's retry count including this failure.
    pub retry_count: i64,
    /// Key of the durable failure record, if the write succeeded.
    pub record_key: Option<String>,
    /// Scratch objects deleted from the working area.
    pub working_objects_deleted: usize,
    /// The normalized failure reason.
    pub cleaned_reason: String,
}

/// Errors handling a failure event.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FailureError {
    /// The event's item path is not a processing-area key.
    #[error("item path is not in the processing area: {path}")]
    BadItemPath {
        /// The offending path.
        path: String,
    },
}

/// Routes failed items through the retry ladder and records each failure.
pub struct FailureController {
    store: Arc<dyn CounterStore>,
    objects: Arc<dyn ObjectStore>,
    tuning: Tuning,
    clock: Arc<dyn Clock>,
    analyzer: Option<Arc<dyn FailureAnalyzer>>,
}

impl FailureController {
    /// Creates a controller over the shared stores.
    pub fn new(
        store: Arc<dyn CounterStore>,
        objects: Arc<dyn ObjectStore>,
        tuning: Tuning,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            objects,
            tuning,
            clock,
            analyzer: None,
        }
    }

    /// Attaches a fire-and-forget diagnostic analyzer.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn FailureAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Handles one terminal pipeline failure.
    ///
    /// Reads the item's durable retry count, moves it to the retry area
    /// (count below budget) or the dead-letter area (budget exhausted),
    /// always deletes the item's scratch prefix, and writes a durable
    /// failure record. A failed move leaves the item in place and is
    /// reported in the outcome, not as an error.
    pub async fn handle(&self, failure: &PipelineFailure) -> Result<FailureOutcome, FailureError> {
        let max_retries = self.tuning.max_retries().await;

        let sub_path = match Area::parse(&failure.item_path) {
            Some((Area::Processing, sub_path)) => sub_path.to_string(),
            _ => {
                return Err(FailureError::BadItemPath {
                    path: failure.item_path.clone(),
                })
            }
        };

        let raw_cause = if failure.raw_cause.is_empty() {
            format!("Execution {}", failure.status)
        } else {
            failure.raw_cause.clone()
        };
        let cleaned_reason = normalize_failure_reason(&raw_cause);

        let retry_count = self.read_retry_count(&failure.item_path).await;
        let new_retry_count = retry_count + 1;

        let action = if retry_count < max_retries {
            self.route(
                &failure.item_path,
                &Area::Retry.key_for(&sub_path),
                new_retry_count,
                false,
            )
            .await
        } else {
            self.route(
                &failure.item_path,
                &Area::DeadLetter.key_for(&sub_path),
                new_retry_count,
                true,
            )
            .await
        };

        // Scratch artifacts are removed whatever happened to the move.
        let working_objects_deleted = self.delete_working(&sub_path).await;

        let record_key = self
            .write_record(failure, new_retry_count, action, &cleaned_reason)
            .await;

        if let Some(analyzer) = &self.analyzer {
            let analyzer = Arc::clone(analyzer);
            let failure = failure.clone();
            tokio::spawn(async move {
                analyzer.analyze(failure, action).await;
            });
        }

        tracing::info!(
            item = failure.item_path,
            action = action.as_str(),
            retry_count = new_retry_count,
            reason = cleaned_reason,
            "handled pipeline failure"
        );

        Ok(FailureOutcome {
            action,
            retry_count: new_retry_count,
            record_key,
            working_objects_deleted,
            cleaned_reason,
        })
    }

    async fn read_retry_count(&self, item_path: &str) -> i64 {
        match self.objects.attributes(item_path).await {
            Ok(attrs) => attrs
                .get(RETRY_COUNT_ATTR)
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(0),
            Err(error) => {
                tracing::warn!(%error, item = item_path, "failed to read retry count, assuming 0");
                0
            }
        }
    }

    /// Copy-then-delete move carrying the updated retry count. A failed
    /// delete rolls the copy back so the item stays in exactly one area.
    async fn route(
        &self,
        src: &str,
        dst: &str,
        retry_count: i64,
        dead_letter: bool,
    ) -> FailureAction {
        let mut overrides = HashMap::new();
        overrides.insert(RETRY_COUNT_ATTR.to_string(), retry_count.to_string());
        if dead_letter {
            overrides.insert(MAX_RETRIES_EXCEEDED_ATTR.to_string(), "true".to_string());
        }

        if let Err(error) = self.objects.copy(src, dst, &overrides).await {
            tracing::error!(%error, src, dst, "failed to copy failed item");
            return FailureAction::MoveFailed;
        }

        if let Err(error) = self.objects.delete(src).await {
            tracing::error!(%error, src, "failed to delete moved item, rolling back");
            if let Err(rollback) = self.objects.delete(dst).await {
                tracing::error!(%rollback, dst, "rollback delete failed");
            }
            return FailureAction::MoveFailed;
        }

        if dead_letter {
            FailureAction::MovedToDeadLetter
        } else {
            FailureAction::MovedToRetry
        }
    }

    async fn delete_working(&self, sub_path: &str) -> usize {
        let prefix = working_prefix_for(sub_path);
        let objects = match self.objects.list(&prefix).await {
            Ok(objects) => objects,
            Err(error) => {
                tracing::warn!(%error, prefix, "failed to list working objects");
                return 0;
            }
        };

        let mut deleted = 0;
        for object in objects {
            match self.objects.delete(&object.key).await {
                Ok(()) => deleted += 1,
                Err(error) => {
                    tracing::warn!(%error, key = object.key, "failed to delete working object");
                }
            }
        }
        if deleted > 0 {
            tracing::info!(prefix, deleted, "cleaned working area");
        }
        deleted
    }

    async fn write_record(
        &self,
        failure: &PipelineFailure,
        retry_count: i64,
        action: FailureAction,
        cleaned_reason: &str,
    ) -> Option<String> {
        let now = self.clock.now();
        let key = format!(
            "{}{}",
            keys::FAILURE_RECORD_PREFIX,
            uuid::Uuid::new_v4().simple()
        );

        let mut fields = Fields::new();
        fields.insert(f::ITEM_ID.to_string(), Value::from(failure.item_path.clone()));
        fields.insert(f::TIMESTAMP.to_string(), Value::from(now.to_rfc3339()));
        fields.insert(f::RETRY_COUNT.to_string(), Value::from(retry_count));
        fields.insert(f::ACTION.to_string(), Value::from(action.as_str()));
        fields.insert(f::CLEANED_REASON.to_string(), Value::from(cleaned_reason));
        fields.insert(
            f::EXECUTION_ID.to_string(),
            Value::from(failure.execution_id.clone()),
        );
        fields.insert(f::NOTIFIED.to_string(), Value::from(false));
        fields.insert(
            f::FAILURE_DATE.to_string(),
            Value::from(now.format("%Y-%m-%d").to_string()),
        );

        match self.store.put(&key, fields).await {
            Ok(()) => Some(key),
            Err(error) => {
                tracing::warn!(%error, item = failure.item_path, "failed to write failure record");
                None
            }
        }
    }
}
