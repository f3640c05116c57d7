//! Transactional writer
//!
//! Applies a synchronization plan to the live table and writes one audit
//! record per applied change, all through the caller's transaction. Deletes
//! run first so a key or id freed by a delete can be reused by an insert in
//! the same plan.

use tracing::debug;

use super::plan::SynchronizationPlan;
use crate::audit::{AuditHistory, AuditRecord};
use crate::error::{SyncError, SyncResult};
use crate::models::{CallContext, EntityId, ObjectType, Payload};
use crate::storage::Transaction;

/// Row counts of one applied plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Unchanged updates that were skipped (and left no audit record)
    pub unchanged: usize,
}

impl SyncOutcome {
    /// Number of audit records written
    pub fn changes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// How unchanged updates are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Write every planned update, changed or not
    #[default]
    RecordAll,
    /// Skip updates whose payload and key are unchanged
    SkipUnchanged,
}

/// Apply `plan` inside `tx`
///
/// Any failing write aborts the call; the caller's transaction then rolls
/// back, taking every earlier row and audit record of the plan with it.
pub fn apply<P: Payload>(
    tx: &mut Transaction,
    object_type: ObjectType,
    plan: SynchronizationPlan<P>,
    context: &CallContext,
    policy: UpdatePolicy,
) -> SyncResult<SyncOutcome> {
    let tables = object_type.tables();
    let history = AuditHistory::new(object_type);
    let mut outcome = SyncOutcome::default();

    for entity in plan.deletes {
        let id = entity.id.ok_or_else(|| {
            SyncError::write_failure(
                tables.live,
                format!("cannot delete '{}' without an identifier", entity.natural_key),
            )
        })?;

        let removed = tx.live(tables.live).delete(entity.parent_id, id)?;
        history.record(
            tx,
            AuditRecord::delete(tables.live, object_type, &removed, context),
        )?;
        outcome.deleted += 1;
    }

    for update in plan.updates {
        if policy == UpdatePolicy::SkipUnchanged && update.is_noop() {
            outcome.unchanged += 1;
            continue;
        }

        let row = update.desired.to_row()?;
        let before = tx.live(tables.live).update(row.clone())?;
        history.record(
            tx,
            AuditRecord::update(tables.live, object_type, &before, &row, context),
        )?;
        outcome.updated += 1;
    }

    for entity in plan.inserts {
        let entity = match entity.id {
            Some(_) => entity,
            None => entity.with_id(EntityId::new()),
        };

        let row = entity.to_row()?;
        tx.live(tables.live).insert(row.clone())?;
        history.record(
            tx,
            AuditRecord::insert(tables.live, object_type, &row, context),
        )?;
        outcome.inserted += 1;
    }

    debug!(
        txid = tx.id(),
        table = tables.live,
        inserted = outcome.inserted,
        updated = outcome.updated,
        deleted = outcome.deleted,
        unchanged = outcome.unchanged,
        "applied synchronization plan"
    );

    Ok(outcome)
}
