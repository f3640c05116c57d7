//! audited-collections - transactional child collections with an audit trail
//!
//! A parent entity (an account, say) owns collections of child records such
//! as email addresses or custom fields. This crate persists such a collection,
//! diffs it against its stored state by natural key, and applies the resulting
//! inserts, updates and deletes inside one transaction together with one
//! append-only audit record per change.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path resolution and persisted settings
//! - `error`: Custom error types
//! - `models`: Child entities, ids, payloads and the call context
//! - `storage`: Embedded transactional store with pluggable backends
//! - `audit`: Audit records and the history shadow tables
//! - `sync`: Equivalence, loading, reconciliation and the transactional writer
//! - `services`: The generic collection engine and concrete collections
//! - `display`, `cli`: Terminal formatting and command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use audited_collections::config::Settings;
//! use audited_collections::models::{CallContext, ParentId};
//! use audited_collections::services::AccountEmailService;
//! use audited_collections::storage::Database;
//!
//! let db = Arc::new(Database::in_memory());
//! let emails = AccountEmailService::new(db, &Settings::default());
//! let account = ParentId::new();
//! emails.save_emails(account, &["a@x.com".into()], &CallContext::new("admin"))?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
pub mod sync;

pub use error::{SyncError, SyncResult};
