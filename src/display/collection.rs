//! Collection display formatting
//!
//! Formats email and custom field collections, sync outcomes and dry-run
//! plans for terminal output.

use crate::models::{AccountEmail, CustomField, EmailAddress};
use crate::sync::{SyncOutcome, SynchronizationPlan};

/// Format an account's email addresses as a table
pub fn format_email_list(emails: &[AccountEmail]) -> String {
    if emails.is_empty() {
        return "No email addresses found.".to_string();
    }

    let address_width = emails
        .iter()
        .map(|e| e.payload.address.chars().count())
        .max()
        .unwrap_or(7)
        .max(7);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<address_width$}  {}\n",
        "Address",
        "ID",
        address_width = address_width,
    ));
    output.push_str(&format!(
        "{:-<address_width$}  {:-<8}\n",
        "",
        "",
        address_width = address_width,
    ));

    for email in emails {
        output.push_str(&format!(
            "{:<address_width$}  {}\n",
            email.payload.address,
            short_id(email),
            address_width = address_width,
        ));
    }

    output.push_str(&format!("\nTotal: {} addresses\n", emails.len()));
    output
}

/// Format a parent's custom fields as a name/value table
pub fn format_field_list(fields: &[CustomField]) -> String {
    if fields.is_empty() {
        return "No custom fields found.".to_string();
    }

    let name_width = fields
        .iter()
        .map(|f| f.name().chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {}\n",
        "Name",
        "Value",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:-<5}\n",
        "",
        "",
        name_width = name_width,
    ));

    for field in fields {
        output.push_str(&format!(
            "{:<name_width$}  {}\n",
            field.name(),
            truncate(&field.payload.value, 60),
            name_width = name_width,
        ));
    }

    output
}

/// One-line summary of an applied change set
pub fn format_outcome(outcome: &SyncOutcome) -> String {
    let mut line = format!(
        "{} inserted, {} updated, {} deleted",
        outcome.inserted, outcome.updated, outcome.deleted
    );
    if outcome.unchanged > 0 {
        line.push_str(&format!(" ({} unchanged skipped)", outcome.unchanged));
    }
    line
}

/// Format a dry-run plan for an email collection
pub fn format_email_plan(plan: &SynchronizationPlan<EmailAddress>) -> String {
    if plan.is_empty() {
        return "Nothing to do.".to_string();
    }

    let mut output = String::new();
    for email in &plan.inserts {
        output.push_str(&format!("  + {}\n", email.payload.address));
    }
    for update in &plan.updates {
        if update.is_noop() {
            output.push_str(&format!("  = {}\n", update.desired.payload.address));
        } else {
            output.push_str(&format!(
                "  ~ {} -> {}\n",
                update.current.payload.address, update.desired.payload.address
            ));
        }
    }
    for email in &plan.deletes {
        output.push_str(&format!("  - {}\n", email.payload.address));
    }
    output
}

fn short_id<P>(entity: &crate::models::ChildEntity<P>) -> String {
    entity
        .id
        .map(|id| id.short())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate to at most `max_len` characters, marking the cut with "..."
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
