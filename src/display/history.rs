//! Audit history display

use crate::audit::AuditRecord;

use super::collection::truncate;

/// Format audit records as a table, oldest first
pub fn format_history(records: &[AuditRecord]) -> String {
    if records.is_empty() {
        return "No history recorded.".to_string();
    }

    let key_width = records
        .iter()
        .map(|r| r.natural_key.chars().count())
        .max()
        .unwrap_or(3)
        .clamp(3, 40);

    let mut output = String::new();
    output.push_str(&format!(
        "{:19}  {:6}  {:<key_width$}  {:12}  {}\n",
        "When",
        "Change",
        "Key",
        "By",
        "Reason",
        key_width = key_width,
    ));
    output.push_str(&format!(
        "{:-<19}  {:-<6}  {:-<key_width$}  {:-<12}  {:-<6}\n",
        "",
        "",
        "",
        "",
        "",
        key_width = key_width,
    ));

    for record in records {
        output.push_str(&format!(
            "{:19}  {:6}  {:<key_width$}  {:12}  {}\n",
            record.changed_at.format("%Y-%m-%d %H:%M:%S"),
            record.change_type,
            truncate(&record.natural_key, key_width),
            truncate(&record.changed_by, 12),
            record.reason_code.as_deref().unwrap_or(""),
            key_width = key_width,
        ));
        if let Some(diff) = &record.diff_summary {
            output.push_str(&format!("{:19}  {}\n", "", diff));
        }
    }

    output
}

/// Full detail of every record, one block each
pub fn format_history_verbose(records: &[AuditRecord]) -> String {
    records
        .iter()
        .map(|r| r.format_human_readable())
        .collect::<Vec<_>>()
        .join("\n")
}
