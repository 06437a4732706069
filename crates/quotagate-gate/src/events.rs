//! Events emitted by the rate gate.

use quotagate_core::ComponentEvent;
use std::time::{Duration, Instant};

/// Which of the two limits turned an attempt away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    /// The concurrent in-flight cap.
    InFlight,
    /// The per-minute request cap.
    RequestsPerMinute,
}

/// Events emitted during slot acquisition and release.
#[derive(Debug, Clone)]
pub enum RateGateEvent {
    /// Both limits granted; the caller may proceed.
    SlotAcquired {
        /// Gate instance name.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// API type label.
        api_type: String,
        /// In-flight count after this acquisition.
        in_flight: i64,
        /// Configured in-flight cap.
        max_in_flight: i64,
        /// Requests started in the current minute after this acquisition.
        request_count: i64,
        /// Configured per-minute cap.
        max_rpm: i64,
        /// Total time spent waiting for the slot.
        waited: Duration,
    },
    /// A slot was handed back.
    SlotReleased {
        /// Gate instance name.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// API type label.
        api_type: String,
        /// In-flight count after the release.
        in_flight: i64,
    },
    /// An attempt was turned away by one of the limits.
    LimitHit {
        /// Gate instance name.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// API type label.
        api_type: String,
        /// Which limit was saturated.
        limit: LimitKind,
        /// Observed counter value.
        observed: i64,
        /// Configured cap.
        max: i64,
        /// Acquisition attempt number.
        attempt: u32,
    },
    /// The wait budget ran out; no slot is held.
    AcquireTimedOut {
        /// Gate instance name.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// API type label.
        api_type: String,
        /// Total time spent waiting.
        waited: Duration,
    },
    /// The compensating decrement after a failed minute-window grant failed.
    ///
    /// The in-flight counter is now drifted until the reconciler corrects it.
    CompensationFailed {
        /// Gate instance name.
        component_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// API type label.
        api_type: String,
    },
}

impl ComponentEvent for RateGateEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateGateEvent::SlotAcquired { .. } => "slot_acquired",
            RateGateEvent::SlotReleased { .. } => "slot_released",
            RateGateEvent::LimitHit { .. } => "limit_hit",
            RateGateEvent::AcquireTimedOut { .. } => "acquire_timed_out",
            RateGateEvent::CompensationFailed { .. } => "compensation_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateGateEvent::SlotAcquired { timestamp, .. }
            | RateGateEvent::SlotReleased { timestamp, .. }
            | RateGateEvent::LimitHit { timestamp, .. }
            | RateGateEvent::AcquireTimedOut { timestamp, .. }
            | RateGateEvent::CompensationFailed { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            RateGateEvent::SlotAcquired { component_name, .. }
            | RateGateEvent::SlotReleased { component_name, .. }
            | RateGateEvent::LimitHit { component_name, .. }
            | RateGateEvent::AcquireTimedOut { component_name, .. }
            | RateGateEvent::CompensationFailed { component_name, .. } => component_name,
        }
    }
}
