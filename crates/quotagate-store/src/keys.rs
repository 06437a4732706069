//! Counter-row key grammar.
//!
//! ```text
//! in_flight_key      := "adobe_api_in_flight"
//! rpm_window_key     := "rpm_window_combined_" YYYYMMDDHHMM
//! tracking_row_key   := "file_" 8*HEXDIG "_" basename
//! global_backoff_key := "global_backoff_until"
//! failure_record_key := "failure_" uuid
//! ```
//!
//! The minute window is keyed on the UTC wall-clock minute and is global
//! across all API types; the upstream quota is not per-type.

use chrono::{DateTime, Utc};

/// Key of the singleton in-flight counter row.
pub const IN_FLIGHT_KEY: &str = "adobe_api_in_flight";

/// Key prefix of per-minute request windows.
pub const RPM_WINDOW_PREFIX: &str = "rpm_window_combined_";

/// Key prefix of per-call tracking rows.
pub const FILE_TRACK_PREFIX: &str = "file_";

/// Key of the optional global backoff row.
pub const GLOBAL_BACKOFF_KEY: &str = "global_backoff_until";

/// Key prefix of durable failure records.
pub const FAILURE_RECORD_PREFIX: &str = "failure_";

/// The kind of row a key addresses, discriminated by prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// The singleton in-flight counter.
    InFlight,
    /// A per-minute request window.
    RpmWindow,
    /// A per-call tracking row.
    FileTrack,
    /// The global backoff marker.
    GlobalBackoff,
    /// A durable failure record.
    FailureRecord,
}

/// Classifies a key by its prefix.
pub fn row_kind(key: &str) -> Option<RowKind> {
    if key == IN_FLIGHT_KEY {
        Some(RowKind::InFlight)
    } else if key == GLOBAL_BACKOFF_KEY {
        Some(RowKind::GlobalBackoff)
    } else if key.starts_with(RPM_WINDOW_PREFIX) {
        Some(RowKind::RpmWindow)
    } else if key.starts_with(FILE_TRACK_PREFIX) {
        Some(RowKind::FileTrack)
    } else if key.starts_with(FAILURE_RECORD_PREFIX) {
        Some(RowKind::FailureRecord)
    } else {
        None
    }
}

/// Builds the request-window key for the minute containing `now`.
pub fn rpm_window_key(now: DateTime<Utc>) -> String {
    format!("{}{}", RPM_WINDOW_PREFIX, now.format("%Y%m%d%H%M"))
}

/// Builds a tracking-row key from a random 8-hex-digit id and a file basename.
pub fn file_track_key(rand8: &str, basename: &str) -> String {
    format!("{FILE_TRACK_PREFIX}{rand8}_{basename}")
}

/// Extracts the basename of a path (the part after the final `/`).
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
