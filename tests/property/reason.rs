//! Reason normalization is total and bounded.

use proptest::prelude::*;
use quotagate::normalize_failure_reason;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: normalization never panics and never exceeds its bound,
    /// whatever the orchestrator throws at it.
    #[test]
    fn never_panics_and_stays_bounded(raw in ".*") {
        let reason = normalize_failure_reason(&raw);
        prop_assert!(reason.chars().count() <= 203, "too long: {} chars", reason.chars().count());
    }

    /// Property: the timeout marker always maps to the fixed reason, no
    /// matter what surrounds it.
    #[test]
    fn timeout_marker_dominates(prefix in "[a-z ]{0,40}", suffix in "[a-z ]{0,40}") {
        let raw = format!("{prefix}States.Timeout{suffix}");
        prop_assert_eq!(normalize_failure_reason(&raw), "Task timed out");
    }

    /// Property: the fallback path strips every quoting artifact.
    #[test]
    fn fallback_output_is_artifact_free(raw in "[a-zA-Z0-9{}\"\\\\ ]{0,300}") {
        prop_assume!(!raw.contains("States."));
        prop_assume!(!raw.contains("Lambda."));
        prop_assume!(!raw.contains("errorMessage"));
        let reason = normalize_failure_reason(&raw);
        prop_assert!(!reason.contains('{'), "contains open brace");
        prop_assert!(!reason.contains('}'), "contains close brace");
        prop_assert!(!reason.contains('\\'));
        prop_assert!(!reason.contains('"'));
    }

    /// Property: embedded error messages come back verbatim, bounded.
    #[test]
    fn embedded_error_message_is_extracted(message in "[a-zA-Z0-9 _.-]{1,300}") {
        prop_assume!(!message.contains("States."));
        prop_assume!(!message.contains("Lambda."));
        let raw = format!(r#"wrapper {{"errorMessage": "{message}", "errorType": "X"}}"#);
        let reason = normalize_failure_reason(&raw);
        prop_assert!(reason.starts_with("Error: "));
        prop_assert!(reason.chars().count() <= 203);
    }
}
