//! Audit history store
//!
//! Append-only access to the history shadow of one collection. Records can be
//! appended inside a transaction and read back per parent; there is no way to
//! change or remove one.

use crate::error::{SyncError, SyncResult};
use crate::models::{ObjectType, ParentId, TableName};
use crate::storage::{TableReader, Transaction};

use super::entry::AuditRecord;

/// History shadow table of one object type
#[derive(Debug, Clone, Copy)]
pub struct AuditHistory {
    object_type: ObjectType,
    tables: TableName,
}

impl AuditHistory {
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            tables: object_type.tables(),
        }
    }

    pub fn table(&self) -> &'static str {
        self.tables.history
    }

    /// Append a record within the transaction that made the live change
    pub(crate) fn record(&self, tx: &mut Transaction, record: AuditRecord) -> SyncResult<()> {
        if record.object_type != self.object_type || record.target_table != self.tables.live {
            return Err(SyncError::invalid_input(format!(
                "audit record for {} ({}) does not belong to {}",
                record.object_type, record.target_table, self.tables.history
            )));
        }

        tx.history(self.tables.history).append(record);
        Ok(())
    }

    /// Every record of a parent, oldest first
    pub fn for_parent(&self, reader: &impl TableReader, parent: ParentId) -> Vec<AuditRecord> {
        reader.history_rows(self.tables.history, parent)
    }
}
