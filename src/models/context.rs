//! Call context
//!
//! Identifies who issued a change and when. The engine copies it unmodified
//! into every audit record written by the call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallContext {
    /// Actor responsible for the change
    pub changed_by: String,

    pub changed_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Correlates all records written by one request
    pub user_token: Uuid,
}

impl CallContext {
    /// Create a context stamped with the current time and a fresh request token
    pub fn new(changed_by: impl Into<String>) -> Self {
        Self {
            changed_by: changed_by.into(),
            changed_at: Utc::now(),
            reason_code: None,
            comment: None,
            user_token: Uuid::new_v4(),
        }
    }

    pub fn with_reason(mut self, reason_code: impl Into<String>) -> Self {
        self.reason_code = Some(reason_code.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.changed_by.trim().is_empty() {
            return Err(SyncError::invalid_input("call context has no actor"));
        }
        Ok(())
    }
}
