//! Typed accessors for the tuning knobs.

use crate::cache::CachedParameters;
use std::sync::Arc;
use std::time::Duration;

/// Canonical parameter names.
pub mod names {
    /// Maximum concurrent outbound API calls.
    pub const MAX_IN_FLIGHT: &str = "max-in-flight";
    /// Maximum API requests per minute, below the upstream hard limit.
    pub const MAX_RPM: &str = "max-rpm";
    /// Intake scheduler skips admission at or above this in-flight count.
    pub const INTAKE_MAX_IN_FLIGHT: &str = "intake-max-in-flight";
    /// Intake scheduler skips admission at or above this pipeline count.
    pub const INTAKE_MAX_RUNNING: &str = "intake-max-running";
    /// Items admitted per scheduler invocation under normal load.
    pub const BATCH_SIZE: &str = "batch-size";
    /// Items admitted per scheduler invocation when the system is idle.
    pub const BATCH_SIZE_LOW: &str = "batch-size-low";
    /// Processing attempts before an item is dead-lettered.
    pub const MAX_RETRIES: &str = "max-retries";
    /// Whether the reconciler is allowed to act.
    pub const RECONCILER_ENABLED: &str = "reconciler-enabled";
    /// Allowed gap between counter and tracked rows before a reset.
    pub const RECONCILER_MAX_DRIFT: &str = "reconciler-max-drift";
    /// Minutes before an unreleased tracking row counts as stale.
    pub const STALE_ENTRY_THRESHOLD: &str = "stale-entry-threshold";
}

/// Typed, cached reads of every tuning knob with its built-in default.
#[derive(Clone)]
pub struct Tuning {
    params: Arc<CachedParameters>,
}

impl Tuning {
    /// Wraps a parameter cache.
    pub fn new(params: Arc<CachedParameters>) -> Self {
        Self { params }
    }

    /// Maximum concurrent outbound API calls. Default 150.
    pub async fn max_in_flight(&self) -> i64 {
        self.params.get_u64(names::MAX_IN_FLIGHT, 150).await as i64
    }

    /// Maximum API requests per minute. Default 150, sized under the
    /// upstream hard quota of ~200 to absorb boundary slack and clock skew.
    pub async fn max_rpm(&self) -> i64 {
        self.params.get_u64(names::MAX_RPM, 150).await as i64
    }

    /// Intake in-flight threshold. Default 5.
    pub async fn intake_max_in_flight(&self) -> i64 {
        self.params.get_u64(names::INTAKE_MAX_IN_FLIGHT, 5).await as i64
    }

    /// Intake running-pipelines threshold. Default 10.
    pub async fn intake_max_running(&self) -> u32 {
        self.params.get_u64(names::INTAKE_MAX_RUNNING, 10).await as u32
    }

    /// Normal admission batch size. Default 1.
    pub async fn batch_size(&self) -> usize {
        self.params.get_u64(names::BATCH_SIZE, 1).await as usize
    }

    /// Idle-system admission batch size. Default 3.
    pub async fn batch_size_low(&self) -> usize {
        self.params.get_u64(names::BATCH_SIZE_LOW, 3).await as usize
    }

    /// Retry budget per item. Default 3.
    pub async fn max_retries(&self) -> i64 {
        self.params.get_u64(names::MAX_RETRIES, 3).await as i64
    }

    /// Whether the reconciler may act. Default true.
    pub async fn reconciler_enabled(&self) -> bool {
        self.params.get_bool(names::RECONCILER_ENABLED, true).await
    }

    /// Allowed counter/tracked drift before a reset. Default 5.
    pub async fn reconciler_max_drift(&self) -> i64 {
        self.params.get_u64(names::RECONCILER_MAX_DRIFT, 5).await as i64
    }

    /// Age before an unreleased tracking row counts as stale. Default 15 min.
    pub async fn stale_entry_threshold(&self) -> Duration {
        let minutes = self.params.get_u64(names::STALE_ENTRY_THRESHOLD, 15).await;
        Duration::from_secs(minutes * 60)
    }
}
