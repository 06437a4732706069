//! Failure-reason normalization.
//!
//! Raw causes arrive as whatever the orchestrator produces: bare strings,
//! task-failure JSON blobs, nested runtime exceptions. Normalization is a
//! total function that extracts the most specific human-readable substring,
//! strips quoting artifacts, and bounds the result at 200 characters. It
//! must never fail; digest emails and dashboards are built on its output.

use serde_json::Value;

const MAX_REASON_LEN: usize = 200;

/// Normalizes a raw failure cause into a clean, bounded reason string.
pub fn normalize_failure_reason(raw: &str) -> String {
    if raw.contains("States.Timeout") {
        return "Task timed out".to_string();
    }

    if raw.contains("States.TaskFailed") {
        return task_failure_reason(raw);
    }

    if raw.contains("Lambda.ServiceException") {
        return "Lambda service error".to_string();
    }

    if raw.contains("Lambda.AWSLambdaException") {
        return "Lambda execution error".to_string();
    }

    if let Some(message) = embedded_error_message(raw) {
        return truncate(&format!("Error: {message}"));
    }

    strip_and_truncate(raw)
}

/// Builds a reason from a task-failure JSON payload. Falls back to a generic
/// reason when the payload does not parse.
fn task_failure_reason(raw: &str) -> String {
    let Some(details) = parse_task_failure(raw) else {
        return "Task failed (unknown): Unknown error".to_string();
    };
    truncate(&format!(
        "Task failed ({}): {}",
        details.container,
        strip_quoting(&details.stopped_reason)
    ))
}

struct TaskFailureDetails {
    container: String,
    stopped_reason: String,
}

fn parse_task_failure(raw: &str) -> Option<TaskFailureDetails> {
    let marker_at = raw.find("States.TaskFailed")?;
    let rest = raw[marker_at + "States.TaskFailed".len()..]
        .trim_start()
        .trim_start_matches(':')
        .trim_start();
    let payload: Value = serde_json::from_str(rest).ok()?;

    let mut stopped_reason = payload
        .get("StoppedReason")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();

    let first_container = payload.get("Containers").and_then(|c| c.get(0));
    let mut container = first_container
        .and_then(|c| c.get("Name"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    if let Some(exit_code) = first_container
        .and_then(|c| c.get("ExitCode"))
        .and_then(Value::as_i64)
    {
        if exit_code != 0 {
            stopped_reason = format!("{stopped_reason} (exit code: {exit_code})");
        }
    }

    // The task definition names the stage more reliably than the container.
    let task_def = payload
        .get("TaskDefinitionArn")
        .and_then(Value::as_str)
        .unwrap_or("");
    if task_def.contains("AltText") {
        container = "alt-text-generator".to_string();
    } else if task_def.contains("Autotag") {
        container = "adobe-autotag".to_string();
    }

    Some(TaskFailureDetails {
        container,
        stopped_reason,
    })
}

/// Pulls the value out of an embedded `"errorMessage": "..."` fragment.
fn embedded_error_message(raw: &str) -> Option<String> {
    let key_at = raw.find("\"errorMessage\"")?;
    let rest = raw[key_at + "\"errorMessage\"".len()..].trim_start();
    let rest = rest.strip_prefix(':')?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    let message = rest[..end].replace('\\', "");
    (!message.is_empty()).then_some(message)
}

fn strip_quoting(s: &str) -> String {
    s.replace('"', "'").replace('\\', "")
}

fn strip_and_truncate(raw: &str) -> String {
    let cleaned: String = raw
        .replace('"', "'")
        .chars()
        .filter(|c| !matches!(c, '\\' | '{' | '}'))
        .collect();
    truncate(cleaned.trim())
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_REASON_LEN {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(MAX_REASON_LEN).collect();
        out.push_str("...");
        out
    }
}
