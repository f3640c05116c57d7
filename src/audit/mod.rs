//! Audit trail
//!
//! Every committed insert, update and delete of a live child row is paired
//! with exactly one `AuditRecord` in the collection's history table, written
//! in the same transaction.
//!
//! - `AuditRecord`: who changed which row, when, how, and the payload
//!   before/after the change.
//! - `AuditHistory`: append-only access to one history table.
//! - `payload_diff`: human-readable summary attached to UPDATE records.

mod diff;
mod entry;
mod history;

pub use diff::payload_diff;
pub use entry::{AuditRecord, ChangeType};
pub use history::AuditHistory;
