//! The rate gate: two-phase slot acquisition with scoped release.

use crate::config::GateConfig;
use crate::error::GateError;
use crate::events::{LimitKind, RateGateEvent};
use crate::jitter::Jitter;
use crate::registry::InFlightRegistry;
use chrono::Timelike;
use quotagate_core::Clock;
use quotagate_params::Tuning;
use quotagate_store::rows::{fields as f, InFlightRow, RpmWindowRow};
use quotagate_store::{keys, retry_transient, CounterStore, Mutation, Precondition, StoreError};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Minute windows expire two minutes after their minute starts.
const RPM_WINDOW_TTL_SECS: i64 = 120;

pub(crate) struct GateShared {
    pub(crate) store: Arc<dyn CounterStore>,
    pub(crate) tuning: Tuning,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) registry: InFlightRegistry,
    pub(crate) config: GateConfig,
    pub(crate) jitter: Jitter,
}

impl GateShared {
    fn now_str(&self) -> String {
        self.clock.now().to_rfc3339()
    }

    /// Unconditional in-flight decrement. Never errors out; a failure here
    /// leaves drift for the reconciler.
    pub(crate) async fn decrement_in_flight(&self, api_type: &str, compensation: bool) -> Option<i64> {
        let mutations = [
            Mutation::add(f::IN_FLIGHT, -1, 1),
            Mutation::set(f::LAST_UPDATED, self.now_str()),
        ];
        match self.store.update(keys::IN_FLIGHT_KEY, &mutations, None).await {
            Ok(fields) => {
                let row = InFlightRow::from_fields(&fields);
                #[cfg(feature = "metrics")]
                gauge!("rate_gate_in_flight", "gate" => self.config.name.clone())
                    .set(row.in_flight as f64);
                Some(row.in_flight)
            }
            Err(error) => {
                tracing::warn!(%error, api_type, compensation, "failed to decrement in-flight counter");
                if compensation {
                    self.config
                        .event_listeners
                        .emit(&RateGateEvent::CompensationFailed {
                            component_name: self.config.name.clone(),
                            timestamp: Instant::now(),
                            api_type: api_type.to_string(),
                        });
                    #[cfg(feature = "metrics")]
                    counter!("rate_gate_compensation_failures_total", "gate" => self.config.name.clone())
                        .increment(1);
                }
                None
            }
        }
    }

    /// Releases a held slot: decrement the counter, then mark the tracking
    /// row. Must never raise; all errors are logged and swallowed.
    pub(crate) async fn release_slot(&self, api_type: &str, filename: Option<&str>) {
        let in_flight = self.decrement_in_flight(api_type, false).await;

        if let Some(filename) = filename {
            self.registry.untrack(filename, api_type).await;
        }

        if let Some(in_flight) = in_flight {
            tracing::info!(api_type, in_flight, "released slot");
            self.config
                .event_listeners
                .emit(&RateGateEvent::SlotReleased {
                    component_name: self.config.name.clone(),
                    timestamp: Instant::now(),
                    api_type: api_type.to_string(),
                    in_flight,
                });
            #[cfg(feature = "metrics")]
            counter!("rate_gate_slots_released_total", "gate" => self.config.name.clone())
                .increment(1);
        }
    }

    async fn current_in_flight(&self) -> i64 {
        match self.store.get(keys::IN_FLIGHT_KEY).await {
            Ok(Some(fields)) => InFlightRow::from_fields(&fields).in_flight,
            Ok(None) => 0,
            Err(error) => {
                tracing::warn!(%error, "failed to read in-flight counter");
                0
            }
        }
    }

    async fn current_rpm(&self) -> i64 {
        let window = keys::rpm_window_key(self.clock.now());
        match self.store.get(&window).await {
            Ok(Some(fields)) => RpmWindowRow::from_fields(&fields).request_count,
            Ok(None) => 0,
            Err(error) => {
                tracing::warn!(%error, "failed to read minute window");
                0
            }
        }
    }
}

/// Point-in-time view of both limits, for dashboards and the intake loop.
#[derive(Debug, Clone, PartialEq)]
pub struct GateUsage {
    /// Current in-flight count.
    pub in_flight: i64,
    /// Configured in-flight cap.
    pub max_in_flight: i64,
    /// Free in-flight slots.
    pub available: i64,
    /// In-flight utilization, percent.
    pub utilization_pct: f64,
    /// Requests started in the current minute.
    pub rpm_current: i64,
    /// Configured per-minute cap.
    pub rpm_max: i64,
    /// Minute-window utilization, percent.
    pub rpm_utilization_pct: f64,
}

/// Dual-limit admission gate for outbound API calls.
///
/// Cheap to clone; clones share the same configuration and counter store.
#[derive(Clone)]
pub struct RateGate {
    shared: Arc<GateShared>,
}

impl RateGate {
    /// Creates a gate over the shared counter store.
    pub fn new(
        store: Arc<dyn CounterStore>,
        tuning: Tuning,
        clock: Arc<dyn Clock>,
        config: GateConfig,
    ) -> Self {
        let jitter = if config.initial_jitter {
            Jitter::random()
        } else {
            Jitter::none()
        };
        let registry = InFlightRegistry::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            shared: Arc::new(GateShared {
                store,
                tuning,
                clock,
                registry,
                config,
                jitter,
            }),
        }
    }

    /// Acquires a slot using the configured default wait budget.
    pub async fn acquire(
        &self,
        api_type: &str,
        filename: Option<&str>,
    ) -> Result<SlotGuard, GateError> {
        self.acquire_with_wait(api_type, filename, self.shared.config.max_wait)
            .await
    }

    /// Acquires a slot, waiting at most `max_wait`.
    ///
    /// The two-phase protocol takes the in-flight slot first, then the
    /// current minute's request budget. A saturated in-flight cap backs off
    /// and retries; a saturated minute window hands the in-flight slot back
    /// and waits for the next minute. With `max_wait` of zero, exactly one
    /// attempt is made.
    ///
    /// On timeout no slot is held and the caller must not make the API call.
    pub async fn acquire_with_wait(
        &self,
        api_type: &str,
        filename: Option<&str>,
        max_wait: Duration,
    ) -> Result<SlotGuard, GateError> {
        let shared = &self.shared;
        let max_in_flight = shared.tuning.max_in_flight().await;
        let max_rpm = shared.tuning.max_rpm().await;
        let started = shared.clock.now();
        let acquire_started = Instant::now();
        let mut attempt: u32 = 0;

        // Spread out synchronized cold starts before touching the store.
        if shared.config.initial_jitter {
            shared
                .clock
                .sleep(shared.jitter.up_to(Duration::from_millis(500)))
                .await;
        }

        loop {
            attempt += 1;

            // Phase A: the in-flight slot. Checked first so a saturated
            // in-flight cap never burns a minute-window grant.
            let in_flight = {
                let mutations = [
                    Mutation::add(f::IN_FLIGHT, 1, 0),
                    Mutation::set(f::LAST_UPDATED, shared.now_str()),
                ];
                let guard = Precondition::absent_or_less_than(f::IN_FLIGHT, max_in_flight);
                let result = retry_transient(&shared.clock, || {
                    shared
                        .store
                        .update(keys::IN_FLIGHT_KEY, &mutations, Some(&guard))
                })
                .await;

                match result {
                    Ok(fields) => InFlightRow::from_fields(&fields).in_flight,
                    Err(StoreError::ConditionFailed) => {
                        let observed = shared.current_in_flight().await;
                        shared.config.event_listeners.emit(&RateGateEvent::LimitHit {
                            component_name: shared.config.name.clone(),
                            timestamp: Instant::now(),
                            api_type: api_type.to_string(),
                            limit: LimitKind::InFlight,
                            observed,
                            max: max_in_flight,
                            attempt,
                        });

                        if let Some(waited) = self.expired(started, max_wait) {
                            return self.timed_out(api_type, waited);
                        }

                        let backoff = Duration::from_secs_f64((2.0 + 0.5 * f64::from(attempt)).min(10.0))
                            + shared.jitter.up_to(Duration::from_secs(1));
                        tracing::info!(
                            api_type,
                            observed,
                            max_in_flight,
                            attempt,
                            wait_secs = backoff.as_secs_f64(),
                            "at in-flight capacity, backing off"
                        );
                        shared.clock.sleep(backoff).await;
                        continue;
                    }
                    Err(error) => return Err(error.into()),
                }
            };

            // Phase B: the minute window. On failure the in-flight slot from
            // Phase A is handed back before waiting.
            let window = keys::rpm_window_key(shared.clock.now());
            let mutations = [
                Mutation::add(f::REQUEST_COUNT, 1, 0),
                Mutation::set(f::LAST_UPDATED, shared.now_str()),
                Mutation::set(f::TTL, shared.clock.unix_seconds() + RPM_WINDOW_TTL_SECS),
            ];
            let guard = Precondition::absent_or_less_than(f::REQUEST_COUNT, max_rpm);
            let result = retry_transient(&shared.clock, || {
                shared.store.update(&window, &mutations, Some(&guard))
            })
            .await;

            match result {
                Ok(fields) => {
                    let request_count = RpmWindowRow::from_fields(&fields).request_count;
                    let waited = acquire_started.elapsed();

                    if let Some(filename) = filename {
                        shared.registry.track(filename, api_type).await;
                    }

                    tracing::info!(
                        api_type,
                        in_flight,
                        max_in_flight,
                        request_count,
                        max_rpm,
                        "acquired slot"
                    );
                    shared
                        .config
                        .event_listeners
                        .emit(&RateGateEvent::SlotAcquired {
                            component_name: shared.config.name.clone(),
                            timestamp: Instant::now(),
                            api_type: api_type.to_string(),
                            in_flight,
                            max_in_flight,
                            request_count,
                            max_rpm,
                            waited,
                        });

                    #[cfg(feature = "metrics")]
                    {
                        counter!("rate_gate_slots_acquired_total", "gate" => shared.config.name.clone())
                            .increment(1);
                        gauge!("rate_gate_in_flight", "gate" => shared.config.name.clone())
                            .set(in_flight as f64);
                    }

                    return Ok(SlotGuard {
                        shared: Arc::clone(shared),
                        api_type: api_type.to_string(),
                        filename: filename.map(str::to_string),
                        released: false,
                    });
                }
                Err(StoreError::ConditionFailed) => {
                    shared.decrement_in_flight(api_type, true).await;

                    let observed = shared.current_rpm().await;
                    shared.config.event_listeners.emit(&RateGateEvent::LimitHit {
                        component_name: shared.config.name.clone(),
                        timestamp: Instant::now(),
                        api_type: api_type.to_string(),
                        limit: LimitKind::RequestsPerMinute,
                        observed,
                        max: max_rpm,
                        attempt,
                    });

                    if let Some(waited) = self.expired(started, max_wait) {
                        return self.timed_out(api_type, waited);
                    }

                    // Wait out the rest of the minute, capped so a long
                    // window is re-checked part way through.
                    let second_of_minute = i64::from(shared.clock.now().second());
                    let base = (61 - second_of_minute).min(15).max(1) as u64;
                    let wait = Duration::from_secs(base) + shared.jitter.up_to(Duration::from_secs(2));
                    tracing::info!(
                        api_type,
                        observed,
                        max_rpm,
                        attempt,
                        wait_secs = wait.as_secs_f64(),
                        "minute budget exhausted, waiting for next window"
                    );
                    shared.clock.sleep(wait).await;
                }
                Err(error) => {
                    shared.decrement_in_flight(api_type, true).await;
                    return Err(error.into());
                }
            }
        }
    }

    /// Acquires, runs `fut`, and always releases — the scoped form.
    pub async fn with_slot<T, Fut>(
        &self,
        api_type: &str,
        filename: Option<&str>,
        fut: Fut,
    ) -> Result<T, GateError>
    where
        Fut: std::future::Future<Output = T>,
    {
        let guard = self.acquire(api_type, filename).await?;
        let output = fut.await;
        guard.release().await;
        Ok(output)
    }

    /// Current in-flight count, zero if the row is missing or unreadable.
    pub async fn current_in_flight(&self) -> i64 {
        self.shared.current_in_flight().await
    }

    /// Point-in-time usage of both limits.
    pub async fn usage(&self) -> GateUsage {
        let max_in_flight = self.shared.tuning.max_in_flight().await;
        let max_rpm = self.shared.tuning.max_rpm().await;
        let in_flight = self.shared.current_in_flight().await;
        let rpm_current = self.shared.current_rpm().await;

        GateUsage {
            in_flight,
            max_in_flight,
            available: (max_in_flight - in_flight).max(0),
            utilization_pct: percentage(in_flight, max_in_flight),
            rpm_current,
            rpm_max: max_rpm,
            rpm_utilization_pct: percentage(rpm_current, max_rpm),
        }
    }

    /// The registry of per-call tracking rows behind this gate.
    pub fn registry(&self) -> &InFlightRegistry {
        &self.shared.registry
    }

    fn expired(&self, started: chrono::DateTime<chrono::Utc>, max_wait: Duration) -> Option<Duration> {
        let waited = (self.shared.clock.now() - started)
            .to_std()
            .unwrap_or_default();
        (waited >= max_wait).then_some(waited)
    }

    fn timed_out(&self, api_type: &str, waited: Duration) -> Result<SlotGuard, GateError> {
        tracing::error!(api_type, waited_secs = waited.as_secs_f64(), "failed to acquire slot");
        self.shared
            .config
            .event_listeners
            .emit(&RateGateEvent::AcquireTimedOut {
                component_name: self.shared.config.name.clone(),
                timestamp: Instant::now(),
                api_type: api_type.to_string(),
                waited,
            });
        #[cfg(feature = "metrics")]
        counter!("rate_gate_acquire_timeouts_total", "gate" => self.shared.config.name.clone())
            .increment(1);
        Err(GateError::AcquireTimeout {
            api_type: api_type.to_string(),
            waited,
        })
    }
}

fn percentage(value: i64, max: i64) -> f64 {
    if max <= 0 {
        return 0.0;
    }
    ((value as f64 / max as f64) * 1000.0).round() / 10.0
}

/// A held slot. Releasing is guaranteed on every exit path.
///
/// The normal path is an explicit `guard.release().await`. If the guard is
/// dropped instead (error return, panic unwind, cancelled future), the
/// release is spawned onto the runtime so the slot still comes back; only
/// process death can leak it, and the reconciler covers that case.
#[must_use = "dropping the guard releases the slot asynchronously; prefer guard.release().await"]
pub struct SlotGuard {
    shared: Arc<GateShared>,
    api_type: String,
    filename: Option<String>,
    released: bool,
}

impl std::fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard")
            .field("api_type", &self.api_type)
            .field("filename", &self.filename)
            .field("released", &self.released)
            .finish()
    }
}

impl SlotGuard {
    /// Releases the slot and consumes the guard.
    pub async fn release(mut self) {
        self.released = true;
        self.shared
            .release_slot(&self.api_type, self.filename.as_deref())
            .await;
    }

    /// API type label this slot was acquired for.
    pub fn api_type(&self) -> &str {
        &self.api_type
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let api_type = std::mem::take(&mut self.api_type);
        let filename = self.filename.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    shared.release_slot(&api_type, filename.as_deref()).await;
                });
            }
            Err(_) => {
                tracing::error!(
                    api_type,
                    "slot guard dropped outside a runtime; slot leaks until reconciled"
                );
            }
        }
    }
}
