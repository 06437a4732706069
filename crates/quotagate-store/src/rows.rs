//! Typed views over store rows.
//!
//! Rows cross the store boundary as raw JSON field maps; everything above the
//! boundary works with these variants. Parsing is lenient the way the rest of
//! the system is: a missing or mistyped field falls back to its zero value
//! rather than failing the read.

use crate::ops::Fields;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Field names shared by multiple row kinds.
pub mod fields {
    /// In-flight counter value.
    pub const IN_FLIGHT: &str = "in_flight";
    /// RFC 3339 time of the last mutation.
    pub const LAST_UPDATED: &str = "last_updated";
    /// RFC 3339 time of the last reconciler write.
    pub const LAST_RECONCILED: &str = "last_reconciled";
    /// Human-readable reason for the last reconciler reset.
    pub const RECONCILE_REASON: &str = "reconcile_reason";
    /// Requests started in a minute window.
    pub const REQUEST_COUNT: &str = "request_count";
    /// Absolute expiry, seconds since the Unix epoch.
    pub const TTL: &str = "ttl";
    /// Tracked file basename.
    pub const FILENAME: &str = "filename";
    /// API type label of a tracked call.
    pub const API_TYPE: &str = "api_type";
    /// RFC 3339 time a tracked call started.
    pub const STARTED_AT: &str = "started_at";
    /// Marker set when a tracked call's slot was released.
    pub const RELEASED: &str = "released";
    /// RFC 3339 time the slot was released.
    pub const RELEASED_AT: &str = "released_at";
    /// Marker set when the reconciler reaped a stale row.
    pub const STALE_CLEANUP: &str = "stale_cleanup";
    /// Backoff expiry, seconds since the Unix epoch.
    pub const BACKOFF_UNTIL: &str = "backoff_until";
    /// Failed item identifier.
    pub const ITEM_ID: &str = "item_id";
    /// RFC 3339 time of the failure.
    pub const TIMESTAMP: &str = "timestamp";
    /// Retry count after the recorded failure.
    pub const RETRY_COUNT: &str = "retry_count";
    /// Routing action taken for the failure.
    pub const ACTION: &str = "action";
    /// Normalized failure reason.
    pub const CLEANED_REASON: &str = "cleaned_reason";
    /// Orchestrator execution id.
    pub const EXECUTION_ID: &str = "execution_id";
    /// Whether the failure has been included in a notification.
    pub const NOTIFIED: &str = "notified";
    /// Day key (`YYYY-MM-DD`) for by-day queries.
    pub const FAILURE_DATE: &str = "failure_date";
}

fn get_i64(fields: &Fields, name: &str) -> i64 {
    fields.get(name).and_then(Value::as_i64).unwrap_or(0)
}

fn get_str(fields: &Fields, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn get_time(fields: &Fields, name: &str) -> Option<DateTime<Utc>> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// The singleton in-flight counter row.
#[derive(Debug, Clone, Default)]
pub struct InFlightRow {
    /// Outstanding API calls across all workers.
    pub in_flight: i64,
    /// Time of the last mutation.
    pub last_updated: Option<DateTime<Utc>>,
    /// Time of the last reconciler write.
    pub last_reconciled: Option<DateTime<Utc>>,
    /// Reason for the last reconciler reset.
    pub reconcile_reason: Option<String>,
}

impl InFlightRow {
    /// Parses the row from raw fields.
    pub fn from_fields(fields: &Fields) -> Self {
        Self {
            in_flight: get_i64(fields, fields::IN_FLIGHT),
            last_updated: get_time(fields, fields::LAST_UPDATED),
            last_reconciled: get_time(fields, fields::LAST_RECONCILED),
            reconcile_reason: get_str(fields, fields::RECONCILE_REASON),
        }
    }
}

/// A per-minute request window row.
#[derive(Debug, Clone, Default)]
pub struct RpmWindowRow {
    /// Requests started in this window.
    pub request_count: i64,
    /// Absolute expiry in Unix seconds.
    pub ttl: i64,
}

impl RpmWindowRow {
    /// Parses the row from raw fields.
    pub fn from_fields(fields: &Fields) -> Self {
        Self {
            request_count: get_i64(fields, fields::REQUEST_COUNT),
            ttl: get_i64(fields, fields::TTL),
        }
    }
}

/// A per-call tracking row.
#[derive(Debug, Clone)]
pub struct FileTrackRow {
    /// The row's key.
    pub key: String,
    /// Tracked file basename.
    pub filename: String,
    /// API type label.
    pub api_type: String,
    /// When the call started.
    pub started_at: Option<DateTime<Utc>>,
    /// Whether the slot has been released.
    pub released: bool,
    /// Whether the reconciler reaped this row as stale.
    pub stale_cleanup: bool,
}

impl FileTrackRow {
    /// Parses the row from its key and raw fields.
    pub fn from_fields(key: &str, fields: &Fields) -> Self {
        Self {
            key: key.to_string(),
            filename: get_str(fields, fields::FILENAME).unwrap_or_default(),
            api_type: get_str(fields, fields::API_TYPE).unwrap_or_default(),
            started_at: get_time(fields, fields::STARTED_AT),
            released: fields.contains_key(fields::RELEASED),
            stale_cleanup: fields.contains_key(fields::STALE_CLEANUP),
        }
    }
}

/// The global backoff row.
#[derive(Debug, Clone, Default)]
pub struct GlobalBackoffRow {
    /// Backoff expiry in Unix seconds.
    pub backoff_until: i64,
}

impl GlobalBackoffRow {
    /// Parses the row from raw fields.
    pub fn from_fields(fields: &Fields) -> Self {
        Self {
            backoff_until: get_i64(fields, fields::BACKOFF_UNTIL),
        }
    }

    /// Remaining backoff at `now` (Unix seconds), clamped at zero.
    pub fn remaining_seconds(&self, now: i64) -> i64 {
        (self.backoff_until - now).max(0)
    }
}

/// A durable failure record row.
#[derive(Debug, Clone)]
pub struct FailureRecordRow {
    /// The row's key.
    pub key: String,
    /// Failed item identifier.
    pub item_id: String,
    /// When the failure was recorded.
    pub timestamp: Option<DateTime<Utc>>,
    /// Retry count after this failure.
    pub retry_count: i64,
    /// Routing action taken.
    pub action: String,
    /// Normalized failure reason.
    pub cleaned_reason: String,
    /// Orchestrator execution id.
    pub execution_id: String,
    /// Whether this failure has been notified.
    pub notified: bool,
    /// Day key for by-day queries.
    pub failure_date: String,
}

impl FailureRecordRow {
    /// Parses the row from its key and raw fields.
    pub fn from_fields(key: &str, fields: &Fields) -> Self {
        Self {
            key: key.to_string(),
            item_id: get_str(fields, fields::ITEM_ID).unwrap_or_default(),
            timestamp: get_time(fields, fields::TIMESTAMP),
            retry_count: get_i64(fields, fields::RETRY_COUNT),
            action: get_str(fields, fields::ACTION).unwrap_or_default(),
            cleaned_reason: get_str(fields, fields::CLEANED_REASON).unwrap_or_default(),
            execution_id: get_str(fields, fields::EXECUTION_ID).unwrap_or_default(),
            notified: fields
                .get(fields::NOTIFIED)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            failure_date: get_str(fields, fields::FAILURE_DATE).unwrap_or_default(),
        }
    }
}
