//! Work-item lifecycle areas.
//!
//! Work items flow through well-known key prefixes in the object store:
//! `intake/` for new arrivals, `processing/` while a pipeline runs,
//! `retry/` for items waiting on another attempt, `dead-letter/` for items
//! whose retry budget is exhausted, and `working/` for per-item scratch
//! artifacts. Sub-paths under each prefix are preserved across moves.

/// Name of the per-item retry counter attribute.
pub const RETRY_COUNT_ATTR: &str = "retry-count";

/// Marker attribute stamped on dead-lettered items.
pub const MAX_RETRIES_EXCEEDED_ATTR: &str = "max-retries-exceeded";

/// A lifecycle area in the work-item store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    /// New items waiting for admission.
    Intake,
    /// Items waiting for another processing attempt.
    Retry,
    /// Items currently owned by a pipeline.
    Processing,
    /// Terminal storage for items whose retry budget is exhausted.
    DeadLetter,
    /// Ephemeral per-item scratch artifacts.
    Working,
}

impl Area {
    /// The key prefix for this area, with trailing slash.
    pub fn prefix(self) -> &'static str {
        match self {
            Area::Intake => "intake/",
            Area::Retry => "retry/",
            Area::Processing => "processing/",
            Area::DeadLetter => "dead-letter/",
            Area::Working => "working/",
        }
    }

    /// Builds the full key for a sub-path in this area.
    pub fn key_for(self, sub_path: &str) -> String {
        format!("{}{}", self.prefix(), sub_path)
    }

    /// Splits a key into its area and sub-path, if it belongs to a known area.
    pub fn parse(key: &str) -> Option<(Area, &str)> {
        for area in [
            Area::Intake,
            Area::Retry,
            Area::Processing,
            Area::DeadLetter,
            Area::Working,
        ] {
            if let Some(rest) = key.strip_prefix(area.prefix()) {
                return Some((area, rest));
            }
        }
        None
    }

    /// Rekeys `key` from this area into `dest`, preserving the sub-path.
    ///
    /// Returns `None` if `key` is not under this area's prefix.
    pub fn rekey(self, key: &str, dest: Area) -> Option<String> {
        key.strip_prefix(self.prefix())
            .map(|sub| dest.key_for(sub))
    }
}

/// Derives the scratch prefix for an item sub-path.
///
/// `reports/q3.pdf` maps to `working/reports/q3/`, mirroring how the
/// processing pipeline lays out per-item artifacts.
pub fn working_prefix_for(sub_path: &str) -> String {
    let stem = sub_path
        .strip_suffix(".pdf")
        .or_else(|| sub_path.strip_suffix(".PDF"))
        .unwrap_or(sub_path);
    format!("{}{}/", Area::Working.prefix(), stem)
}
