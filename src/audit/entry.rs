//! Audit record data structures
//!
//! One `AuditRecord` documents exactly one committed live-row change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{CallContext, EntityId, HistoryRecordId, ObjectType, ParentId};
use crate::storage::LiveRow;

/// Kind of change applied to a live row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ChangeType::Insert => "INSERT",
            ChangeType::Update => "UPDATE",
            ChangeType::Delete => "DELETE",
        };
        f.pad(label)
    }
}

/// A single row of a history shadow table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub history_record_id: HistoryRecordId,

    /// Live table the change was applied to
    pub target_table: String,

    /// Identifier of the live row, already assigned for inserts
    pub target_id: EntityId,

    pub object_type: ObjectType,
    pub parent_id: ParentId,
    pub natural_key: String,
    pub change_type: ChangeType,

    pub changed_by: String,
    pub changed_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    pub user_token: Uuid,

    /// Payload before the change (updates and deletes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<serde_json::Value>,

    /// Payload after the change (inserts and updates)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
}

impl AuditRecord {
    fn base(
        target_table: &str,
        object_type: ObjectType,
        row: &LiveRow,
        change_type: ChangeType,
        context: &CallContext,
    ) -> Self {
        Self {
            history_record_id: HistoryRecordId::new(),
            target_table: target_table.to_string(),
            target_id: row.id,
            object_type,
            parent_id: row.parent_id,
            natural_key: row.natural_key.clone(),
            change_type,
            changed_by: context.changed_by.clone(),
            changed_at: context.changed_at,
            reason_code: context.reason_code.clone(),
            comment: context.comment.clone(),
            user_token: context.user_token,
            before: None,
            after: None,
            diff_summary: None,
        }
    }

    /// Record for a newly inserted row
    pub fn insert(
        target_table: &str,
        object_type: ObjectType,
        row: &LiveRow,
        context: &CallContext,
    ) -> Self {
        let mut record = Self::base(target_table, object_type, row, ChangeType::Insert, context);
        record.after = Some(row.payload.clone());
        record
    }

    /// Record for an overwritten row
    pub fn update(
        target_table: &str,
        object_type: ObjectType,
        before: &LiveRow,
        after: &LiveRow,
        context: &CallContext,
    ) -> Self {
        let mut record = Self::base(target_table, object_type, after, ChangeType::Update, context);
        record.before = Some(before.payload.clone());
        record.after = Some(after.payload.clone());
        record.diff_summary = super::diff::payload_diff(&before.payload, &after.payload);
        record
    }

    /// Record for a removed row
    pub fn delete(
        target_table: &str,
        object_type: ObjectType,
        row: &LiveRow,
        context: &CallContext,
    ) -> Self {
        let mut record = Self::base(target_table, object_type, row, ChangeType::Delete, context);
        record.before = Some(row.payload.clone());
        record
    }

    /// Format the record for a single terminal line (plus an optional diff line)
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {} {} ({}) by {}",
            self.changed_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.change_type,
            self.object_type,
            self.target_id,
            self.natural_key,
            self.changed_by
        );

        if let Some(reason) = &self.reason_code {
            output.push_str(&format!(" [{}]", reason));
        }

        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        output
    }
}
