//! The reconciliation control loop.

use chrono::Duration as ChronoDuration;
use quotagate_core::{Clock, Orchestrator};
use quotagate_gate::InFlightRegistry;
use quotagate_params::Tuning;
use quotagate_store::rows::{fields as f, InFlightRow};
use quotagate_store::{keys, CounterStore, Mutation};
use std::sync::Arc;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// What one reconciler invocation did to the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// The counter looked healthy; nothing was written.
    None,
    /// Reconciliation is disabled by parameter.
    Disabled,
    /// Counter reset to zero: no active work anywhere.
    ResetToZero,
    /// Counter reset down to the tracked-row count.
    ResetToTracked,
    /// Negative counter reset to zero.
    ResetNegative,
    /// A reset was needed but the write failed.
    ResetFailed,
}

/// Summary of one reconciler invocation.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// What was done to the counter.
    pub action: ReconcileAction,
    /// Counter value observed at the start.
    pub counter_before: i64,
    /// Counter value after this invocation.
    pub counter_after: i64,
    /// Unreleased tracking rows observed.
    pub tracked: usize,
    /// Running workers, if the orchestrator answered.
    pub running_workers: Option<u32>,
    /// Running pipelines, if the orchestrator answered.
    pub running_pipelines: Option<u32>,
    /// Stale tracking rows reaped.
    pub stale_cleaned: usize,
    /// Why the counter was reset, when it was.
    pub reason: Option<String>,
}

/// Periodic control loop that repairs in-flight counter drift.
pub struct Reconciler {
    store: Arc<dyn CounterStore>,
    registry: InFlightRegistry,
    orchestrator: Arc<dyn Orchestrator>,
    tuning: Tuning,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    /// Creates a reconciler over the shared store and orchestrator signals.
    pub fn new(
        store: Arc<dyn CounterStore>,
        orchestrator: Arc<dyn Orchestrator>,
        tuning: Tuning,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = InFlightRegistry::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            store,
            registry,
            orchestrator,
            tuning,
            clock,
        }
    }

    /// Runs one reconciliation pass and returns its summary.
    pub async fn run_once(&self) -> ReconcileReport {
        if !self.tuning.reconciler_enabled().await {
            tracing::info!("reconciler disabled by parameter");
            return ReconcileReport {
                action: ReconcileAction::Disabled,
                counter_before: 0,
                counter_after: 0,
                tracked: 0,
                running_workers: None,
                running_pipelines: None,
                stale_cleaned: 0,
                reason: None,
            };
        }

        let max_drift = self.tuning.reconciler_max_drift().await;
        let counter = self.counter_value().await;
        let tracked = self.registry.active_count().await;
        let running_workers = self.signal(self.orchestrator.running_workers().await);
        let running_pipelines = self.signal(self.orchestrator.running_pipelines().await);

        tracing::info!(
            counter,
            tracked,
            ?running_workers,
            ?running_pipelines,
            "reconciler state"
        );

        #[cfg(feature = "metrics")]
        {
            gauge!("reconciler_in_flight_counter").set(counter as f64);
            gauge!("reconciler_tracked_files").set(tracked as f64);
            if let Some(workers) = running_workers {
                gauge!("reconciler_running_workers").set(f64::from(workers));
            }
            if let Some(pipelines) = running_pipelines {
                gauge!("reconciler_running_pipelines").set(f64::from(pipelines));
            }
        }

        // Decision ladder, first match wins. An unknown orchestrator signal
        // never justifies the "no active work" reset.
        let decision = if counter > 0
            && running_workers == Some(0)
            && running_pipelines == Some(0)
        {
            Some((0, "no active work", ReconcileAction::ResetToZero))
        } else if counter > tracked as i64 + max_drift {
            Some((
                tracked as i64,
                "counter exceeds tracked by > drift",
                ReconcileAction::ResetToTracked,
            ))
        } else if counter < 0 {
            Some((0, "negative counter", ReconcileAction::ResetNegative))
        } else {
            None
        };

        let (action, counter_after, reason) = match decision {
            None => (ReconcileAction::None, counter, None),
            Some((target, reason, action)) => {
                tracing::warn!(counter, target, reason, "reconciliation needed");
                if self.reset_counter(target, reason).await {
                    #[cfg(feature = "metrics")]
                    counter!("reconciliation_resets_total").increment(1);
                    (action, target, Some(reason.to_string()))
                } else {
                    (ReconcileAction::ResetFailed, counter, Some(reason.to_string()))
                }
            }
        };

        let stale_cleaned = self.reap_stale_rows().await;
        #[cfg(feature = "metrics")]
        if stale_cleaned > 0 {
            counter!("stale_entries_cleaned_total").increment(stale_cleaned as u64);
        }

        ReconcileReport {
            action,
            counter_before: counter,
            counter_after,
            tracked,
            running_workers,
            running_pipelines,
            stale_cleaned,
            reason,
        }
    }

    fn signal(&self, result: Result<u32, quotagate_core::OrchestratorError>) -> Option<u32> {
        match result {
            Ok(count) => Some(count),
            Err(error) => {
                tracing::warn!(%error, "orchestrator signal unavailable");
                None
            }
        }
    }

    async fn counter_value(&self) -> i64 {
        match self.store.get(keys::IN_FLIGHT_KEY).await {
            Ok(Some(fields)) => InFlightRow::from_fields(&fields).in_flight,
            Ok(None) => 0,
            Err(error) => {
                tracing::warn!(%error, "failed to read in-flight counter");
                0
            }
        }
    }

    /// Unconditional counter write stamping the reconciliation metadata.
    async fn reset_counter(&self, value: i64, reason: &str) -> bool {
        let now = self.clock.now().to_rfc3339();
        let mutations = [
            Mutation::set(f::IN_FLIGHT, value),
            Mutation::set(f::LAST_UPDATED, now.clone()),
            Mutation::set(f::LAST_RECONCILED, now),
            Mutation::set(f::RECONCILE_REASON, reason),
        ];
        match self.store.update(keys::IN_FLIGHT_KEY, &mutations, None).await {
            Ok(_) => {
                tracing::info!(value, reason, "reset in-flight counter");
                true
            }
            Err(error) => {
                tracing::error!(%error, "failed to reset in-flight counter");
                false
            }
        }
    }

    /// Marks unreleased tracking rows older than the stale threshold.
    ///
    /// The threshold sits far above any healthy call duration, so a row this
    /// old means its worker died without releasing.
    async fn reap_stale_rows(&self) -> usize {
        let threshold = self.tuning.stale_entry_threshold().await;
        let cutoff = self.clock.now()
            - ChronoDuration::from_std(threshold).unwrap_or(ChronoDuration::zero());

        let mut reaped = 0;
        for row in self.registry.list_active().await {
            let stale = match row.started_at {
                Some(started_at) => started_at < cutoff,
                None => true,
            };
            if !stale {
                continue;
            }

            let mutations = [
                Mutation::set(f::RELEASED, true),
                Mutation::set(f::STALE_CLEANUP, true),
                Mutation::set(f::RELEASED_AT, self.clock.now().to_rfc3339()),
            ];
            match self.store.update(&row.key, &mutations, None).await {
                Ok(_) => {
                    tracing::info!(key = row.key, filename = row.filename, "reaped stale tracking row");
                    reaped += 1;
                }
                Err(error) => {
                    tracing::warn!(%error, key = row.key, "failed to reap stale tracking row");
                }
            }
        }
        reaped
    }
}
