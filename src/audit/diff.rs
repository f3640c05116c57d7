//! Payload diffs for UPDATE records
//!
//! Produces a short, deterministic summary of what changed between two
//! payload snapshots. Nested objects are walked and reported with dotted paths.

use serde_json::Value;
use std::collections::BTreeSet;

/// Summarize the differences between two payloads
///
/// Returns `None` when the payloads are equal.
pub fn payload_diff(before: &Value, after: &Value) -> Option<String> {
    let mut changes = Vec::new();
    collect_changes(before, after, "", &mut changes);

    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

fn collect_changes(before: &Value, after: &Value, path: &str, changes: &mut Vec<String>) {
    if before == after {
        return;
    }

    let (Value::Object(left), Value::Object(right)) = (before, after) else {
        let label = if path.is_empty() { "value" } else { path };
        changes.push(format!(
            "{}: {} -> {}",
            label,
            render(before),
            render(after)
        ));
        return;
    };

    let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
    for key in keys {
        let child_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };

        match (left.get(key), right.get(key)) {
            (Some(l), Some(r)) => collect_changes(l, r, &child_path, changes),
            (Some(l), None) => changes.push(format!("{}: {} -> (removed)", child_path, render(l))),
            (None, Some(r)) => changes.push(format!("{}: (added) -> {}", child_path, render(r))),
            (None, None) => {}
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() > 50 => {
            let head: String = s.chars().take(47).collect();
            format!("\"{}...\"", head)
        }
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(fields) => format!("{{{} fields}}", fields.len()),
        other => other.to_string(),
    }
}
