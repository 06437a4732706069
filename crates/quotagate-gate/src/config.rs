//! Configuration for the rate gate.

use crate::events::{LimitKind, RateGateEvent};
use quotagate_core::{EventListeners, FnListener};
use std::time::Duration;

/// Configuration for a [`crate::RateGate`] instance.
#[derive(Clone)]
pub struct GateConfig {
    /// Name of this gate instance, used in events and logs.
    pub(crate) name: String,
    /// Default wait budget for `acquire`.
    pub(crate) max_wait: Duration,
    /// Whether to sleep a random 0-500 ms before the first attempt.
    pub(crate) initial_jitter: bool,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<RateGateEvent>,
}

impl GateConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> GateConfigBuilder {
        GateConfigBuilder::new()
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfigBuilder::new().build()
    }
}

/// Builder for gate configuration.
pub struct GateConfigBuilder {
    name: String,
    max_wait: Duration,
    initial_jitter: bool,
    event_listeners: EventListeners<RateGateEvent>,
}

impl GateConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: "rate-gate".to_string(),
            max_wait: Duration::from_secs(300),
            initial_jitter: true,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name of this gate instance.
    ///
    /// Default: "rate-gate"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the default wait budget for `acquire`.
    ///
    /// Default: 300 s
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Enables or disables the random 0-500 ms sleep before the first
    /// attempt. The jitter spreads out synchronized cold starts; disable it
    /// only in tests.
    ///
    /// Default: true
    pub fn initial_jitter(mut self, enabled: bool) -> Self {
        self.initial_jitter = enabled;
        self
    }

    /// Registers a callback for successful acquisitions.
    ///
    /// Called with the in-flight count after the acquisition and the total
    /// time the caller waited.
    pub fn on_slot_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(i64, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateGateEvent::SlotAcquired {
                in_flight, waited, ..
            } = event
            {
                f(*in_flight, *waited);
            }
        }));
        self
    }

    /// Registers a callback for slot releases.
    ///
    /// Called with the in-flight count after the release.
    pub fn on_slot_released<F>(mut self, f: F) -> Self
    where
        F: Fn(i64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateGateEvent::SlotReleased { in_flight, .. } = event {
                f(*in_flight);
            }
        }));
        self
    }

    /// Registers a callback for attempts turned away by a saturated limit.
    ///
    /// Called with the limit kind, the observed counter value, and the cap.
    pub fn on_limit_hit<F>(mut self, f: F) -> Self
    where
        F: Fn(LimitKind, i64, i64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateGateEvent::LimitHit {
                limit, observed, max, ..
            } = event
            {
                f(*limit, *observed, *max);
            }
        }));
        self
    }

    /// Registers a callback for acquisitions that ran out of wait budget.
    ///
    /// Called with the total time spent waiting.
    pub fn on_acquire_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateGateEvent::AcquireTimedOut { waited, .. } = event {
                f(*waited);
            }
        }));
        self
    }

    /// Registers a callback for failed compensating decrements.
    ///
    /// After this fires, the in-flight counter is drifted until the
    /// reconciler corrects it.
    pub fn on_compensation_failed<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RateGateEvent::CompensationFailed { .. } = event {
                f();
            }
        }));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> GateConfig {
        GateConfig {
            name: self.name,
            max_wait: self.max_wait,
            initial_jitter: self.initial_jitter,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for GateConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
