//! Embedded store with single-writer transactions
//!
//! `Database` holds the committed image of every live and history table.
//! A write transaction takes the writer lock, works on a private copy of the
//! image, and publishes it only after the backend has persisted it. Readers
//! share the committed image and never observe a transaction in flight.
//!
//! The writer lock is held for the whole unit of work, so a
//! read-merge-write cycle on a parent's collection cannot interleave with
//! another one. The lock is not reentrant: code already inside a transaction
//! must use the `Transaction` handle it was given instead of opening a new one.
//!
//! The writer lock covers one `Database` handle. A file-backed store also
//! holds the file's lock for the handle's lifetime, so only one handle per
//! store file can exist at a time.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::backend::{JsonFileBackend, MemoryBackend, StoreBackend};
use crate::audit::AuditRecord;
use crate::error::{SyncError, SyncResult};
use crate::models::{EntityId, ParentId};

/// Store format version written by this build
pub const STORE_SCHEMA_VERSION: u32 = 1;

fn current_schema() -> u32 {
    STORE_SCHEMA_VERSION
}

/// One row of a live child-collection table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveRow {
    pub id: EntityId,
    pub parent_id: ParentId,
    pub natural_key: String,
    pub payload: serde_json::Value,
}

type ParentRows = BTreeMap<EntityId, LiveRow>;

/// Full image of the store: live tables and their history shadows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default = "current_schema")]
    schema_version: u32,

    /// table -> parent -> row id -> row
    #[serde(default)]
    live: BTreeMap<String, BTreeMap<ParentId, ParentRows>>,

    /// table -> append-only records
    #[serde(default)]
    history: BTreeMap<String, Vec<AuditRecord>>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            schema_version: STORE_SCHEMA_VERSION,
            live: BTreeMap::new(),
            history: BTreeMap::new(),
        }
    }
}

impl StoreData {
    pub(crate) fn check_schema(&self) -> SyncResult<()> {
        if self.schema_version > STORE_SCHEMA_VERSION {
            return Err(SyncError::Storage(format!(
                "store schema version {} is newer than supported version {}",
                self.schema_version, STORE_SCHEMA_VERSION
            )));
        }
        Ok(())
    }

    /// Number of live rows in a table across all parents
    pub fn live_row_count(&self, table: &str) -> usize {
        self.live
            .get(table)
            .map(|parents| parents.values().map(|rows| rows.len()).sum())
            .unwrap_or(0)
    }

    /// Number of records in a history table
    pub fn history_len(&self, table: &str) -> usize {
        self.history.get(table).map(|h| h.len()).unwrap_or(0)
    }

    fn insert_row(&mut self, table: &str, row: LiveRow) -> SyncResult<()> {
        let parents = self.live.entry(table.to_string()).or_default();

        if parents.values().any(|rows| rows.contains_key(&row.id)) {
            return Err(SyncError::constraint(
                table,
                format!("duplicate row id {}", row.id),
            ));
        }

        let rows = parents.entry(row.parent_id).or_default();
        if rows.values().any(|r| r.natural_key == row.natural_key) {
            return Err(SyncError::constraint(
                table,
                format!(
                    "duplicate key '{}' for parent {}",
                    row.natural_key, row.parent_id
                ),
            ));
        }

        rows.insert(row.id, row);
        Ok(())
    }

    fn update_row(&mut self, table: &str, row: LiveRow) -> SyncResult<LiveRow> {
        let rows = self
            .live
            .get_mut(table)
            .and_then(|parents| parents.get_mut(&row.parent_id))
            .ok_or_else(|| SyncError::write_failure(table, format!("no row {}", row.id)))?;

        if rows
            .values()
            .any(|r| r.id != row.id && r.natural_key == row.natural_key)
        {
            return Err(SyncError::constraint(
                table,
                format!(
                    "duplicate key '{}' for parent {}",
                    row.natural_key, row.parent_id
                ),
            ));
        }

        let slot = rows
            .get_mut(&row.id)
            .ok_or_else(|| SyncError::write_failure(table, format!("no row {}", row.id)))?;

        Ok(std::mem::replace(slot, row))
    }

    fn delete_row(&mut self, table: &str, parent: ParentId, id: EntityId) -> SyncResult<LiveRow> {
        let parents = self
            .live
            .get_mut(table)
            .ok_or_else(|| SyncError::write_failure(table, format!("no row {}", id)))?;

        let rows = parents
            .get_mut(&parent)
            .ok_or_else(|| SyncError::write_failure(table, format!("no row {}", id)))?;

        let removed = rows
            .remove(&id)
            .ok_or_else(|| SyncError::write_failure(table, format!("no row {}", id)))?;

        if rows.is_empty() {
            parents.remove(&parent);
        }

        Ok(removed)
    }

    fn append_history(&mut self, table: &str, record: AuditRecord) {
        self.history.entry(table.to_string()).or_default().push(record);
    }
}

/// Read access shared by committed snapshots and open transactions
pub trait TableReader {
    /// All live rows a parent owns in a table
    fn live_rows(&self, table: &str, parent: ParentId) -> Vec<LiveRow>;

    /// History records of a parent in a history table, oldest first
    fn history_rows(&self, table: &str, parent: ParentId) -> Vec<AuditRecord>;
}

impl TableReader for StoreData {
    fn live_rows(&self, table: &str, parent: ParentId) -> Vec<LiveRow> {
        self.live
            .get(table)
            .and_then(|parents| parents.get(&parent))
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn history_rows(&self, table: &str, parent: ParentId) -> Vec<AuditRecord> {
        self.history
            .get(table)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.parent_id == parent)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// An open unit of work
///
/// Writes land in a private copy of the store. Nothing becomes visible to
/// other callers until `Database::run_in_transaction` commits it.
///
/// Outside this crate a transaction can only be read or handed to the
/// audited collection operations; rows and history are written by the
/// sync writer alone.
///
/// ```compile_fail
/// use audited_collections::models::ParentId;
/// use audited_collections::storage::Database;
///
/// let db = Database::in_memory();
/// let _ = db.run_in_transaction(|tx| {
///     let _ = tx.live("account_emails").delete(ParentId::new(), Default::default());
///     Ok(())
/// });
/// ```
#[derive(Debug)]
pub struct Transaction {
    id: u64,
    working: StoreData,
    live_writes: usize,
    dirty: bool,
    fault: Arc<Mutex<Option<usize>>>,
    fail_after: Option<usize>,
}

impl Transaction {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Live-row writes performed so far
    pub fn live_writes(&self) -> usize {
        self.live_writes
    }

    /// Handle on a live table, bound to this transaction
    pub(crate) fn live<'tx>(&'tx mut self, table: &'tx str) -> LiveTable<'tx> {
        LiveTable { table, tx: self }
    }

    /// Append-only handle on a history table, bound to this transaction
    pub(crate) fn history<'tx>(&'tx mut self, table: &'tx str) -> HistoryTable<'tx> {
        HistoryTable { table, tx: self }
    }

    fn charge_live_write(&mut self, table: &str) -> SyncResult<()> {
        if self.live_writes == 0 {
            self.fail_after = self.fault.lock().take();
        }
        if let Some(limit) = self.fail_after {
            if self.live_writes >= limit {
                return Err(SyncError::write_failure(
                    table,
                    format!("injected write fault after {} writes", limit),
                ));
            }
        }
        self.live_writes += 1;
        self.dirty = true;
        Ok(())
    }
}

impl TableReader for Transaction {
    fn live_rows(&self, table: &str, parent: ParentId) -> Vec<LiveRow> {
        self.working.live_rows(table, parent)
    }

    fn history_rows(&self, table: &str, parent: ParentId) -> Vec<AuditRecord> {
        self.working.history_rows(table, parent)
    }
}

/// Typed accessor for one live table inside a transaction
pub(crate) struct LiveTable<'tx> {
    table: &'tx str,
    tx: &'tx mut Transaction,
}

impl LiveTable<'_> {
    pub(crate) fn insert(&mut self, row: LiveRow) -> SyncResult<()> {
        self.tx.charge_live_write(self.table)?;
        self.tx.working.insert_row(self.table, row)
    }

    /// Overwrite an existing row, returning its previous state
    pub(crate) fn update(&mut self, row: LiveRow) -> SyncResult<LiveRow> {
        self.tx.charge_live_write(self.table)?;
        self.tx.working.update_row(self.table, row)
    }

    /// Remove a row, returning it
    pub(crate) fn delete(&mut self, parent: ParentId, id: EntityId) -> SyncResult<LiveRow> {
        self.tx.charge_live_write(self.table)?;
        self.tx.working.delete_row(self.table, parent, id)
    }
}

/// Append-only accessor for one history table inside a transaction
pub(crate) struct HistoryTable<'tx> {
    table: &'tx str,
    tx: &'tx mut Transaction,
}

impl HistoryTable<'_> {
    pub(crate) fn append(&mut self, record: AuditRecord) {
        self.tx.dirty = true;
        self.tx.working.append_history(self.table, record);
    }
}

/// The store: committed image, its backend, and the writer lock
pub struct Database {
    backend: Box<dyn StoreBackend>,
    committed: RwLock<StoreData>,
    next_txid: AtomicU64,
    armed_fault: Arc<Mutex<Option<usize>>>,
}

impl Database {
    /// Open a database over a backend, loading its committed image
    pub fn open(backend: impl StoreBackend + 'static) -> SyncResult<Self> {
        let data = backend.load()?;
        data.check_schema()?;
        debug!(backend = %backend.describe(), "opened store");

        Ok(Self {
            backend: Box::new(backend),
            committed: RwLock::new(data),
            next_txid: AtomicU64::new(1),
            armed_fault: Arc::new(Mutex::new(None)),
        })
    }

    /// Open a database persisted as a single JSON file
    ///
    /// Fails with `StoreLocked` while another handle has the file open.
    pub fn open_file(path: impl AsRef<Path>) -> SyncResult<Self> {
        Self::open(JsonFileBackend::open(path.as_ref())?)
    }

    /// A fresh, empty, memory-only database
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::new()),
            committed: RwLock::new(StoreData::default()),
            next_txid: AtomicU64::new(1),
            armed_fault: Arc::new(Mutex::new(None)),
        }
    }

    /// Run a read against the committed image
    pub fn read<T, F>(&self, f: F) -> SyncResult<T>
    where
        F: FnOnce(&StoreData) -> SyncResult<T>,
    {
        let committed = self.committed.read();
        f(&committed)
    }

    /// Run a unit of work atomically
    ///
    /// If `work` returns `Ok`, every write it made is persisted and published
    /// together. If it returns `Err`, or persisting fails, nothing it wrote
    /// survives and the error is returned unchanged (commit failures become
    /// `TransactionFailure`).
    pub fn run_in_transaction<T, F>(&self, work: F) -> SyncResult<T>
    where
        F: FnOnce(&mut Transaction) -> SyncResult<T>,
    {
        let mut committed = self.committed.write();

        let mut tx = Transaction {
            id: self.next_txid.fetch_add(1, Ordering::SeqCst),
            working: committed.clone(),
            live_writes: 0,
            dirty: false,
            fault: Arc::clone(&self.armed_fault),
            fail_after: None,
        };
        debug!(txid = tx.id, "begin transaction");

        let value = match work(&mut tx) {
            Ok(value) => value,
            Err(err) => {
                warn!(txid = tx.id, error = %err, "rolling back transaction");
                return Err(err);
            }
        };

        if !tx.dirty {
            debug!(txid = tx.id, "read-only transaction finished");
            return Ok(value);
        }

        if let Err(err) = self.backend.persist(&tx.working) {
            warn!(txid = tx.id, error = %err, "commit failed, rolling back");
            return Err(SyncError::TransactionFailure(format!(
                "commit of transaction {} failed: {}",
                tx.id, err
            )));
        }

        *committed = tx.working;
        info!(txid = tx.id, live_writes = tx.live_writes, "committed transaction");
        Ok(value)
    }

    /// Make the next write transaction fail its live-row write once
    /// `after_writes` writes have succeeded
    ///
    /// The fault is consumed by the first transaction that writes a live
    /// row; read-only transactions leave it armed. Used to verify that a
    /// failure in the middle of a unit of work leaves no trace.
    pub fn arm_write_fault(&self, after_writes: usize) {
        *self.armed_fault.lock() = Some(after_writes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallContext, ObjectType};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    const TABLE: &str = "account_emails";
    const HISTORY: &str = "account_email_history";

    fn row(parent: ParentId, key: &str) -> LiveRow {
        LiveRow {
            id: EntityId::new(),
            parent_id: parent,
            natural_key: key.to_string(),
            payload: json!({"address": key}),
        }
    }

    #[test]
    fn test_commit_publishes_writes() {
        let db = Database::in_memory();
        let parent = ParentId::new();

        db.run_in_transaction(|tx| tx.live(TABLE).insert(row(parent, "a@x.com")))
            .unwrap();

        let rows = db.read(|data| Ok(data.live_rows(TABLE, parent))).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].natural_key, "a@x.com");
    }

    #[test]
    fn test_error_rolls_back_everything() {
        let db = Database::in_memory();
        let parent = ParentId::new();

        let result: SyncResult<()> = db.run_in_transaction(|tx| {
            tx.live(TABLE).insert(row(parent, "a@x.com"))?;
            let live = row(parent, "b@x.com");
            tx.history(HISTORY).append(AuditRecord::insert(
                TABLE,
                ObjectType::AccountEmail,
                &live,
                &CallContext::new("tester"),
            ));
            Err(SyncError::invalid_input("abort"))
        });

        assert!(result.is_err());
        db.read(|data| {
            assert_eq!(data.live_row_count(TABLE), 0);
            assert_eq!(data.history_len(HISTORY), 0);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_duplicate_key_is_constraint_violation() {
        let db = Database::in_memory();
        let parent = ParentId::new();

        let err = db
            .run_in_transaction(|tx| {
                let mut live = tx.live(TABLE);
                live.insert(row(parent, "a@x.com"))?;
                live.insert(row(parent, "a@x.com"))
            })
            .unwrap_err();

        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_same_key_allowed_under_different_parents() {
        let db = Database::in_memory();

        db.run_in_transaction(|tx| {
            let mut live = tx.live(TABLE);
            live.insert(row(ParentId::new(), "a@x.com"))?;
            live.insert(row(ParentId::new(), "a@x.com"))
        })
        .unwrap();

        assert_eq!(db.read(|d| Ok(d.live_row_count(TABLE))).unwrap(), 2);
    }

    #[test]
    fn test_update_and_delete_missing_row() {
        let db = Database::in_memory();
        let parent = ParentId::new();

        let err = db
            .run_in_transaction(|tx| tx.live(TABLE).update(row(parent, "a@x.com")))
            .unwrap_err();
        assert!(matches!(err, SyncError::WriteFailure { .. }));

        let err = db
            .run_in_transaction(|tx| tx.live(TABLE).delete(parent, EntityId::new()))
            .unwrap_err();
        assert!(matches!(err, SyncError::WriteFailure { .. }));
    }

    #[test]
    fn test_update_returns_previous_state() {
        let db = Database::in_memory();
        let parent = ParentId::new();
        let original = row(parent, "a@x.com");

        db.run_in_transaction(|tx| tx.live(TABLE).insert(original.clone()))
            .unwrap();

        let mut changed = original.clone();
        changed.payload = json!({"address": "A@x.com"});
        let before = db
            .run_in_transaction(|tx| tx.live(TABLE).update(changed.clone()))
            .unwrap();

        assert_eq!(before, original);
        let rows = db.read(|d| Ok(d.live_rows(TABLE, parent))).unwrap();
        assert_eq!(rows, vec![changed]);
    }

    #[test]
    fn test_armed_fault_fails_nth_write_once() {
        let db = Database::in_memory();
        let parent = ParentId::new();
        db.arm_write_fault(2);

        let err = db
            .run_in_transaction(|tx| {
                let mut live = tx.live(TABLE);
                for key in ["a@x.com", "b@x.com", "c@x.com"] {
                    live.insert(row(parent, key))?;
                }
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, SyncError::WriteFailure { .. }));
        assert_eq!(db.read(|d| Ok(d.live_row_count(TABLE))).unwrap(), 0);

        db.run_in_transaction(|tx| {
            let mut live = tx.live(TABLE);
            for key in ["a@x.com", "b@x.com", "c@x.com"] {
                live.insert(row(parent, key))?;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(db.read(|d| Ok(d.live_row_count(TABLE))).unwrap(), 3);
    }

    #[test]
    fn test_armed_fault_survives_read_only_transaction() {
        let db = Database::in_memory();
        let parent = ParentId::new();
        db.arm_write_fault(0);

        db.run_in_transaction(|tx| Ok(tx.live_rows(TABLE, parent).len()))
            .unwrap();

        let err = db
            .run_in_transaction(|tx| tx.live(TABLE).insert(row(parent, "a@x.com")))
            .unwrap_err();
        assert!(matches!(err, SyncError::WriteFailure { .. }));

        db.run_in_transaction(|tx| tx.live(TABLE).insert(row(parent, "a@x.com")))
            .unwrap();
        assert_eq!(db.read(|d| Ok(d.live_row_count(TABLE))).unwrap(), 1);
    }

    #[test]
    fn test_commit_failure_is_transaction_failure() {
        let backend = Arc::new(MemoryBackend::new());
        let db = Database::open(Arc::clone(&backend)).unwrap();
        let parent = ParentId::new();
        backend.reject_commits(true);

        let err = db
            .run_in_transaction(|tx| tx.live(TABLE).insert(row(parent, "a@x.com")))
            .unwrap_err();

        assert!(matches!(err, SyncError::TransactionFailure(_)));
        assert_eq!(db.read(|d| Ok(d.live_row_count(TABLE))).unwrap(), 0);
    }

    #[test]
    fn test_file_backed_store_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        let parent = ParentId::new();

        {
            let db = Database::open_file(&path).unwrap();
            db.run_in_transaction(|tx| tx.live(TABLE).insert(row(parent, "a@x.com")))
                .unwrap();
        }

        let reopened = Database::open_file(&path).unwrap();
        let rows = reopened.read(|d| Ok(d.live_rows(TABLE, parent))).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_second_handle_on_open_file_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        let parent = ParentId::new();

        let first = Database::open_file(&path).unwrap();
        let err = Database::open_file(&path).err().unwrap();
        assert!(err.is_store_locked());

        first
            .run_in_transaction(|tx| tx.live(TABLE).insert(row(parent, "a@x.com")))
            .unwrap();
        drop(first);

        let second = Database::open_file(&path).unwrap();
        second
            .run_in_transaction(|tx| tx.live(TABLE).insert(row(parent, "b@x.com")))
            .unwrap();
        assert_eq!(second.read(|d| Ok(d.live_row_count(TABLE))).unwrap(), 2);
    }

    #[test]
    fn test_transactions_serialize_read_modify_write() {
        let db = Arc::new(Database::in_memory());
        let parent = ParentId::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = Arc::clone(&db);
                std::thread::spawn(move || {
                    db.run_in_transaction(|tx| {
                        let seen = tx.live_rows(TABLE, parent).len();
                        tx.live(TABLE)
                            .insert(row(parent, &format!("user{}-{}@x.com", i, seen)))
                    })
                    .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut keys: Vec<String> = db
            .read(|d| Ok(d.live_rows(TABLE, parent)))
            .unwrap()
            .into_iter()
            .map(|r| r.natural_key)
            .collect();
        keys.sort();
        assert_eq!(keys.len(), 8);

        // every writer saw the rows committed before it, so counts 0..8 all appear
        let mut seen: Vec<usize> = keys
            .iter()
            .map(|k| {
                k.split('-').nth(1).unwrap().trim_end_matches("@x.com").parse().unwrap()
            })
            .collect();
        seen.sort();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }
}
