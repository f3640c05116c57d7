//! Core data models
//!
//! Child entities, their parents and concrete payload kinds, plus the call
//! context threaded into every audit record.

pub mod context;
pub mod custom_field;
pub mod email;
pub mod entity;
pub mod ids;

pub use context::CallContext;
pub use custom_field::{CustomField, FieldValue};
pub use email::{AccountEmail, EmailAddress, EmailValidationError};
pub use entity::{ChildEntity, ObjectType, ParentRef, Payload, TableName};
pub use ids::{EntityId, HistoryRecordId, ParentId};
