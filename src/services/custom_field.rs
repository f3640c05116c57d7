//! Custom field service
//!
//! Name/value pairs attached to a parent. Field names are compared exactly.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::collection::{update_policy, AuditedCollection, CollectionConfig};
use crate::audit::AuditRecord;
use crate::config::Settings;
use crate::error::{SyncError, SyncResult};
use crate::models::{CallContext, CustomField, FieldValue, ObjectType, ParentId};
use crate::storage::Database;
use crate::sync::SyncOutcome;

pub struct CustomFieldService {
    fields: AuditedCollection<FieldValue>,
}

impl CustomFieldService {
    pub fn new(db: Arc<Database>, settings: &Settings) -> Self {
        let config = CollectionConfig::new(ObjectType::CustomField)
            .with_update_policy(update_policy(settings));

        Self {
            fields: AuditedCollection::new(db, config),
        }
    }

    /// All fields of a parent, ordered by name
    pub fn get_fields(&self, parent: ParentId) -> SyncResult<Vec<CustomField>> {
        self.fields.get_all(parent)
    }

    /// Replace every field of `parent` with `values`
    pub fn save_fields(
        &self,
        parent: ParentId,
        values: &BTreeMap<String, String>,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        let desired = values
            .iter()
            .map(|(name, value)| CustomField::field(parent, name.as_str(), value.as_str()))
            .collect();
        self.fields.save_all(parent, desired, context)
    }

    /// Set one field, creating it if needed
    pub fn set_field(
        &self,
        parent: ParentId,
        name: &str,
        value: &str,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        self.fields
            .add_one(parent, CustomField::field(parent, name, value), context)
    }

    pub fn remove_field(
        &self,
        parent: ParentId,
        name: &str,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        let field = CustomField::field(parent, name, "");
        if field.name().is_empty() {
            return Err(SyncError::invalid_input("Field name cannot be empty"));
        }
        self.fields.remove_one(parent, field, context)
    }

    pub fn field_history(&self, parent: ParentId) -> SyncResult<Vec<AuditRecord>> {
        self.fields.history(parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::ChangeType;

    fn service() -> CustomFieldService {
        CustomFieldService::new(Arc::new(Database::in_memory()), &Settings::default())
    }

    #[test]
    fn test_save_and_set_fields() {
        let service = service();
        let parent = ParentId::new();
        let ctx = CallContext::new("tester").with_reason("import");

        let mut values = BTreeMap::new();
        values.insert("tier".to_string(), "gold".to_string());
        values.insert("region".to_string(), "eu".to_string());
        let outcome = service.save_fields(parent, &values, &ctx).unwrap();
        assert_eq!(outcome.inserted, 2);

        let outcome = service.set_field(parent, "tier", "silver", &ctx).unwrap();
        assert_eq!(outcome.updated, 1);

        let fields = service.get_fields(parent).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].name(), "tier");
        assert_eq!(fields[1].payload.value, "silver");

        let history = service.field_history(parent).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].change_type, ChangeType::Update);
        assert_eq!(history[2].reason_code.as_deref(), Some("import"));
        assert!(history[2].diff_summary.is_some());
    }

    #[test]
    fn test_remove_field() {
        let service = service();
        let parent = ParentId::new();
        let ctx = CallContext::new("tester");
        service.set_field(parent, "tier", "gold", &ctx).unwrap();

        assert_eq!(service.remove_field(parent, "tier", &ctx).unwrap().deleted, 1);
        assert_eq!(service.remove_field(parent, "tier", &ctx).unwrap().changes(), 0);
        assert!(service.remove_field(parent, "  ", &ctx).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_fields_and_emails_do_not_mix() {
        let db = Arc::new(Database::in_memory());
        let settings = Settings::default();
        let fields = CustomFieldService::new(Arc::clone(&db), &settings);
        let emails = crate::services::AccountEmailService::new(db, &settings);
        let parent = ParentId::new();
        let ctx = CallContext::new("tester");

        fields.set_field(parent, "a@x.com", "value", &ctx).unwrap();
        emails.add_email(parent, "a@x.com", &ctx).unwrap();

        assert_eq!(fields.get_fields(parent).unwrap().len(), 1);
        assert_eq!(emails.get_emails(parent).unwrap().len(), 1);
        assert_eq!(fields.field_history(parent).unwrap().len(), 1);
        assert_eq!(emails.email_history(parent).unwrap().len(), 1);
    }
}
