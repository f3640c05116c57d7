//! Custom field model
//!
//! Free-form name/value pairs attached to a parent, keyed by field name.

use serde::{Deserialize, Serialize};

use super::entity::ChildEntity;
use super::ids::ParentId;

/// Payload of one custom field row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: String,
}

pub type CustomField = ChildEntity<FieldValue>;

impl ChildEntity<FieldValue> {
    /// Build an unsaved custom field row
    pub fn field(parent_id: ParentId, name: impl Into<String>, value: impl Into<String>) -> Self {
        ChildEntity::new(
            parent_id,
            name.into().trim().to_string(),
            FieldValue {
                value: value.into(),
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.natural_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_constructor() {
        let parent = ParentId::new();
        let field = CustomField::field(parent, " tier ", "gold");
        assert_eq!(field.name(), "tier");
        assert_eq!(field.payload.value, "gold");
    }
}
