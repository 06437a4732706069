//! The intake control loop.

use quotagate_core::{Area, Clock, ObjectInfo, ObjectStore, Orchestrator};
use quotagate_params::Tuning;
use quotagate_store::rows::{GlobalBackoffRow, InFlightRow};
use quotagate_store::{keys, CounterStore};
use std::collections::HashMap;
use std::sync::Arc;

/// Capacity floor under which the scheduler admits the larger idle batch.
const LOW_WATER_IN_FLIGHT: i64 = 3;
const LOW_WATER_RUNNING: u32 = 10;

/// What one scheduler invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeAction {
    /// One or more items were admitted into the processing area.
    Admitted,
    /// Capacity or backoff checks refused admission.
    Skipped,
    /// Nothing was waiting.
    NoFiles,
}

/// Summary of one scheduler invocation.
#[derive(Debug, Clone)]
pub struct IntakeReport {
    /// What the invocation did.
    pub action: IntakeAction,
    /// Why admission was refused or stopped, if it was.
    pub reason: Option<String>,
    /// Items admitted from the retry area.
    pub admitted_retry: usize,
    /// Items admitted from the intake area.
    pub admitted_intake: usize,
    /// Waiting items left behind after this invocation.
    pub remaining: usize,
    /// Observed in-flight count.
    pub in_flight: i64,
    /// Observed running-pipeline count, if the orchestrator answered.
    pub running_pipelines: Option<u32>,
    /// True when a failed move stopped admission before the batch filled.
    pub stopped_early: bool,
}

impl IntakeReport {
    fn skipped(reason: String, in_flight: i64, running: Option<u32>) -> Self {
        Self {
            action: IntakeAction::Skipped,
            reason: Some(reason),
            admitted_retry: 0,
            admitted_intake: 0,
            remaining: 0,
            in_flight,
            running_pipelines: running,
            stopped_early: false,
        }
    }

    /// Total items admitted by this invocation.
    pub fn admitted(&self) -> usize {
        self.admitted_retry + self.admitted_intake
    }
}

/// Periodic control loop that admits work into the processing area.
pub struct IntakeScheduler {
    store: Arc<dyn CounterStore>,
    objects: Arc<dyn ObjectStore>,
    orchestrator: Arc<dyn Orchestrator>,
    tuning: Tuning,
    clock: Arc<dyn Clock>,
}

impl IntakeScheduler {
    /// Creates a scheduler over the shared stores and orchestrator signals.
    pub fn new(
        store: Arc<dyn CounterStore>,
        objects: Arc<dyn ObjectStore>,
        orchestrator: Arc<dyn Orchestrator>,
        tuning: Tuning,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            objects,
            orchestrator,
            tuning,
            clock,
        }
    }

    /// Runs one scheduling pass and returns its summary.
    ///
    /// Admission is refused outright while a global backoff is active or
    /// either capacity signal is at its threshold. Otherwise up to one
    /// batch of items is moved, retry area first, oldest first.
    pub async fn run_once(&self) -> IntakeReport {
        // Backoff gate.
        if let Some(remaining) = self.backoff_remaining().await {
            tracing::info!(remaining_secs = remaining, "global backoff active, skipping admission");
            return IntakeReport::skipped(
                format!("global backoff active ({remaining}s remaining)"),
                0,
                None,
            );
        }

        // Capacity gates. An unreadable signal counts as saturated: the
        // scheduler only admits when it can see that there is room.
        let in_flight = match self.store.get(keys::IN_FLIGHT_KEY).await {
            Ok(fields) => fields
                .map(|fields| InFlightRow::from_fields(&fields).in_flight)
                .unwrap_or(0),
            Err(error) => {
                tracing::error!(%error, "in-flight counter unreadable, skipping admission");
                return IntakeReport::skipped("in-flight counter unreadable".to_string(), 0, None);
            }
        };

        let intake_max_in_flight = self.tuning.intake_max_in_flight().await;
        if in_flight >= intake_max_in_flight {
            tracing::info!(in_flight, threshold = intake_max_in_flight, "in-flight above threshold, skipping admission");
            return IntakeReport::skipped(
                format!("in-flight count ({in_flight}) above threshold ({intake_max_in_flight})"),
                in_flight,
                None,
            );
        }

        let running = match self.orchestrator.running_pipelines().await {
            Ok(running) => running,
            Err(error) => {
                tracing::error!(%error, "orchestrator signal unavailable, skipping admission");
                return IntakeReport::skipped(
                    "running-pipeline count unavailable".to_string(),
                    in_flight,
                    None,
                );
            }
        };

        let intake_max_running = self.tuning.intake_max_running().await;
        if running >= intake_max_running {
            tracing::info!(running, threshold = intake_max_running, "running pipelines above threshold, skipping admission");
            return IntakeReport::skipped(
                format!("running pipelines ({running}) above threshold ({intake_max_running})"),
                in_flight,
                Some(running),
            );
        }

        // Sizing: an idle system takes the larger batch.
        let batch = if in_flight < LOW_WATER_IN_FLIGHT && running < LOW_WATER_RUNNING {
            self.tuning.batch_size_low().await
        } else {
            self.tuning.batch_size().await
        };

        // Retry area first: that work has already waited once.
        let retry_waiting = self.waiting_items(Area::Retry).await;
        let intake_waiting = self.waiting_items(Area::Intake).await;
        let total_waiting = retry_waiting.len() + intake_waiting.len();

        if total_waiting == 0 {
            tracing::info!("no files waiting for admission");
            return IntakeReport {
                action: IntakeAction::NoFiles,
                reason: Some("no files waiting".to_string()),
                admitted_retry: 0,
                admitted_intake: 0,
                remaining: 0,
                in_flight,
                running_pipelines: Some(running),
                stopped_early: false,
            };
        }

        let mut admitted_retry = 0;
        let mut admitted_intake = 0;
        let mut stopped_early = false;
        let mut stop_reason = None;

        for item in &retry_waiting {
            if admitted_retry >= batch {
                break;
            }
            match self.admit(Area::Retry, &item.key).await {
                Ok(()) => admitted_retry += 1,
                Err(reason) => {
                    stopped_early = true;
                    stop_reason = Some(reason);
                    break;
                }
            }
        }

        if !stopped_early {
            for item in &intake_waiting {
                if admitted_retry + admitted_intake >= batch {
                    break;
                }
                match self.admit(Area::Intake, &item.key).await {
                    Ok(()) => admitted_intake += 1,
                    Err(reason) => {
                        stopped_early = true;
                        stop_reason = Some(reason);
                        break;
                    }
                }
            }
        }

        let admitted = admitted_retry + admitted_intake;
        let remaining = total_waiting - admitted;
        tracing::info!(
            admitted_retry,
            admitted_intake,
            remaining,
            in_flight,
            running,
            "admission pass complete"
        );

        IntakeReport {
            action: if admitted > 0 {
                IntakeAction::Admitted
            } else {
                IntakeAction::Skipped
            },
            reason: stop_reason,
            admitted_retry,
            admitted_intake,
            remaining,
            in_flight,
            running_pipelines: Some(running),
            stopped_early,
        }
    }

    async fn backoff_remaining(&self) -> Option<i64> {
        match self.store.get(keys::GLOBAL_BACKOFF_KEY).await {
            Ok(Some(fields)) => {
                let row = GlobalBackoffRow::from_fields(&fields);
                let remaining = row.remaining_seconds(self.clock.unix_seconds());
                (remaining > 0).then_some(remaining)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(%error, "failed to read global backoff row");
                None
            }
        }
    }

    /// Items waiting in an area, oldest first.
    async fn waiting_items(&self, area: Area) -> Vec<ObjectInfo> {
        let mut items = match self.objects.list(area.prefix()).await {
            Ok(items) => items,
            Err(error) => {
                tracing::error!(%error, area = area.prefix(), "failed to list waiting items");
                return Vec::new();
            }
        };
        items.retain(|item| item.key.to_ascii_lowercase().ends_with(".pdf"));
        items.sort_by_key(|item| item.last_modified);
        items
    }

    /// Moves one item into the processing area: copy, then delete the
    /// original. A failed delete rolls the copy back so the item never
    /// exists in two areas after this returns.
    async fn admit(&self, from: Area, key: &str) -> Result<(), String> {
        let Some(processing_key) = from.rekey(key, Area::Processing) else {
            return Err(format!("item key {key} is not under {}", from.prefix()));
        };

        if let Err(error) = self
            .objects
            .copy(key, &processing_key, &HashMap::new())
            .await
        {
            tracing::error!(%error, key, "copy into processing area failed");
            return Err(format!("copy of {key} failed: {error}"));
        }

        if let Err(error) = self.objects.delete(key).await {
            tracing::error!(%error, key, "delete of admitted item failed, rolling back");
            if let Err(rollback) = self.objects.delete(&processing_key).await {
                tracing::error!(%rollback, key = processing_key, "rollback delete failed");
            }
            return Err(format!("delete of {key} failed: {error}"));
        }

        tracing::info!(from = key, to = processing_key, "admitted item");
        Ok(())
    }
}
