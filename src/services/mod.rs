//! Service layer
//!
//! The generic audited collection engine and the concrete collections built on
//! it. Services validate input and pick the equivalence and update policies;
//! the engine does the loading, reconciling and writing.

pub mod collection;
pub mod custom_field;
pub mod email;

pub use collection::{AuditedCollection, CollectionConfig};
pub use custom_field::CustomFieldService;
pub use email::AccountEmailService;
