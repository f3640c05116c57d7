//! Child entity model
//!
//! A `ChildEntity` is one row of a parent's collection. Its identity may be
//! absent until the writer assigns one; reconciliation never relies on it and
//! compares entities by their natural key instead.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{EntityId, ParentId};
use crate::error::{SyncError, SyncResult};
use crate::storage::LiveRow;

/// Bound satisfied by every payload a collection can store
pub trait Payload: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {}

impl<T> Payload for T where T: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {}

/// Which child-collection table family a parent's rows live in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    AccountEmail,
    CustomField,
}

impl ObjectType {
    /// Live and history table names for this object type
    pub fn tables(&self) -> TableName {
        match self {
            ObjectType::AccountEmail => TableName {
                live: "account_emails",
                history: "account_email_history",
            },
            ObjectType::CustomField => TableName {
                live: "custom_fields",
                history: "custom_field_history",
            },
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::AccountEmail => write!(f, "AccountEmail"),
            ObjectType::CustomField => write!(f, "CustomField"),
        }
    }
}

/// Addressing for one collection: its live table and its history shadow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableName {
    pub live: &'static str,
    pub history: &'static str,
}

/// A parent identifier tagged with the collection it owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentRef {
    pub id: ParentId,
    pub object_type: ObjectType,
}

impl ParentRef {
    pub fn new(id: ParentId, object_type: ObjectType) -> Self {
        Self { id, object_type }
    }

    pub fn tables(&self) -> TableName {
        self.object_type.tables()
    }
}

/// One record of a parent's child collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildEntity<P> {
    /// Assigned by the writer on first insert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,

    pub parent_id: ParentId,

    /// Unique within one parent at any point in time
    pub natural_key: String,

    pub payload: P,
}

impl<P: Payload> ChildEntity<P> {
    /// Create an entity that has not been persisted yet
    pub fn new(parent_id: ParentId, natural_key: impl Into<String>, payload: P) -> Self {
        Self {
            id: None,
            parent_id,
            natural_key: natural_key.into(),
            payload,
        }
    }

    /// Return a copy carrying the given identity
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Check required fields
    pub fn validate(&self) -> SyncResult<()> {
        if self.natural_key.trim().is_empty() {
            return Err(SyncError::invalid_input("natural key cannot be empty"));
        }
        Ok(())
    }

    /// Convert into a live-table row; the entity must already have an id
    pub fn to_row(&self) -> SyncResult<LiveRow> {
        let id = self.id.ok_or_else(|| {
            SyncError::invalid_input(format!(
                "entity '{}' has no identifier assigned",
                self.natural_key
            ))
        })?;

        Ok(LiveRow {
            id,
            parent_id: self.parent_id,
            natural_key: self.natural_key.clone(),
            payload: serde_json::to_value(&self.payload)?,
        })
    }

    /// Rebuild an entity from a stored live-table row
    pub fn from_row(row: &LiveRow) -> SyncResult<Self> {
        let payload = serde_json::from_value(row.payload.clone()).map_err(|e| {
            SyncError::Json(format!(
                "Failed to decode payload of row {}: {}",
                row.id, e
            ))
        })?;

        Ok(Self {
            id: Some(row.id),
            parent_id: row.parent_id,
            natural_key: row.natural_key.clone(),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tables_per_object_type() {
        let emails = ObjectType::AccountEmail.tables();
        assert_eq!(emails.live, "account_emails");
        assert_eq!(emails.history, "account_email_history");
        assert_ne!(emails, ObjectType::CustomField.tables());
    }

    #[test]
    fn test_empty_natural_key_rejected() {
        let entity = ChildEntity::new(ParentId::new(), "   ", json!({}));
        assert!(entity.validate().unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_to_row_requires_id() {
        let entity = ChildEntity::new(ParentId::new(), "a@x.com", json!({"v": 1}));
        assert!(entity.to_row().is_err());

        let id = EntityId::new();
        let row = entity.clone().with_id(id).to_row().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.payload, json!({"v": 1}));

        let back: ChildEntity<serde_json::Value> = ChildEntity::from_row(&row).unwrap();
        assert_eq!(back, entity.with_id(id));
    }
}
