//! Audited collection engine
//!
//! One generic engine serves every child-collection kind. A kind is described
//! by a `CollectionConfig`: its object type (which selects the live and
//! history tables), its equivalence resolver, and its update policy.
//!
//! Bulk saves and single-item operations share one path: load the persisted
//! set, build the desired set, reconcile, apply. Every public operation runs
//! in its own transaction; `save_all_in` joins a transaction the caller
//! already holds.

use std::sync::Arc;

use tracing::info;

use crate::audit::{AuditHistory, AuditRecord};
use crate::config::Settings;
use crate::error::{SyncError, SyncResult};
use crate::models::{CallContext, ChildEntity, ObjectType, ParentId, ParentRef, Payload};
use crate::storage::{Database, Transaction};
use crate::sync::{
    apply, load_entities, reconcile, EquivalenceKey, EquivalenceResolver, KeyedEntities,
    SyncOutcome, SynchronizationPlan, UpdatePolicy,
};

/// Describes one collection kind
#[derive(Debug, Clone)]
pub struct CollectionConfig<P> {
    pub object_type: ObjectType,
    pub resolver: EquivalenceResolver<P>,
    pub update_policy: UpdatePolicy,
}

impl<P: Payload> CollectionConfig<P> {
    /// Natural-key equivalence, every update recorded
    pub fn new(object_type: ObjectType) -> Self {
        Self {
            object_type,
            resolver: EquivalenceResolver::natural_key(),
            update_policy: UpdatePolicy::RecordAll,
        }
    }

    pub fn with_resolver(mut self, resolver: EquivalenceResolver<P>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }
}

/// Update policy selected by `skip_unchanged_updates`
pub(crate) fn update_policy(settings: &Settings) -> UpdatePolicy {
    if settings.skip_unchanged_updates {
        UpdatePolicy::SkipUnchanged
    } else {
        UpdatePolicy::RecordAll
    }
}

/// A parent's audited child collection of one kind
pub struct AuditedCollection<P> {
    db: Arc<Database>,
    config: CollectionConfig<P>,
    history: AuditHistory,
}

impl<P: Payload> AuditedCollection<P> {
    pub fn new(db: Arc<Database>, config: CollectionConfig<P>) -> Self {
        let history = AuditHistory::new(config.object_type);
        Self {
            db,
            config,
            history,
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.config.object_type
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    fn parent_ref(&self, parent: ParentId) -> ParentRef {
        ParentRef::new(parent, self.config.object_type)
    }

    /// Current children of `parent`, ordered by equivalence key
    pub fn get_all(&self, parent: ParentId) -> SyncResult<Vec<ChildEntity<P>>> {
        let parent = self.parent_ref(parent);
        self.db.read(|data| {
            load_entities(data, parent, &self.config.resolver).map(KeyedEntities::into_values)
        })
    }

    /// Audit trail of `parent`'s collection, oldest first
    pub fn history(&self, parent: ParentId) -> SyncResult<Vec<AuditRecord>> {
        self.db.read(|data| Ok(self.history.for_parent(data, parent)))
    }

    /// Preview the plan `save_all` would apply, without writing anything
    pub fn plan(
        &self,
        parent: ParentId,
        desired: Vec<ChildEntity<P>>,
    ) -> SyncResult<SynchronizationPlan<P>> {
        self.check_entities(parent, &desired)?;
        let parent_ref = self.parent_ref(parent);
        self.db.read(|data| {
            let persisted = load_entities(data, parent_ref, &self.config.resolver)?;
            Ok(reconcile(&persisted, desired, &self.config.resolver))
        })
    }

    /// Replace the whole collection with `desired`
    pub fn save_all(
        &self,
        parent: ParentId,
        desired: Vec<ChildEntity<P>>,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        self.db
            .run_in_transaction(|tx| self.save_all_in(tx, parent, desired, context))
    }

    /// Replace the whole collection inside a transaction the caller holds
    pub fn save_all_in(
        &self,
        tx: &mut Transaction,
        parent: ParentId,
        desired: Vec<ChildEntity<P>>,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        context.validate()?;
        self.check_entities(parent, &desired)?;

        let persisted = load_entities(&*tx, self.parent_ref(parent), &self.config.resolver)?;
        let plan = reconcile(&persisted, desired, &self.config.resolver);
        self.write(tx, parent, plan, context)
    }

    /// Insert `entity`, or replace the child sharing its key
    pub fn add_one(
        &self,
        parent: ParentId,
        entity: ChildEntity<P>,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        context.validate()?;
        self.check_entities(parent, std::slice::from_ref(&entity))?;

        self.db.run_in_transaction(|tx| {
            let persisted = load_entities(&*tx, self.parent_ref(parent), &self.config.resolver)?;
            let key = self.config.resolver.key_of(&entity);

            let mut working = persisted.clone();
            working.upsert(key.clone(), entity);

            self.merge_and_write(tx, parent, &persisted, working, &key, context)
        })
    }

    /// Remove the child sharing `entity`'s key; absent keys are a no-op
    pub fn remove_one(
        &self,
        parent: ParentId,
        entity: ChildEntity<P>,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        context.validate()?;
        self.check_entities(parent, std::slice::from_ref(&entity))?;

        self.db.run_in_transaction(|tx| {
            let persisted = load_entities(&*tx, self.parent_ref(parent), &self.config.resolver)?;
            let key = self.config.resolver.key_of(&entity);

            let mut working = persisted.clone();
            working.remove(&key);

            self.merge_and_write(tx, parent, &persisted, working, &key, context)
        })
    }

    fn merge_and_write(
        &self,
        tx: &mut Transaction,
        parent: ParentId,
        persisted: &KeyedEntities<P>,
        working: KeyedEntities<P>,
        touched: &EquivalenceKey,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        let plan = reconcile(persisted, working.into_values(), &self.config.resolver)
            .only_touching(touched, &self.config.resolver);
        self.write(tx, parent, plan, context)
    }

    fn write(
        &self,
        tx: &mut Transaction,
        parent: ParentId,
        plan: SynchronizationPlan<P>,
        context: &CallContext,
    ) -> SyncResult<SyncOutcome> {
        let outcome = apply(
            tx,
            self.config.object_type,
            plan,
            context,
            self.config.update_policy,
        )?;

        info!(
            object_type = %self.config.object_type,
            parent = %parent,
            changed_by = %context.changed_by,
            inserted = outcome.inserted,
            updated = outcome.updated,
            deleted = outcome.deleted,
            "synchronized collection"
        );

        Ok(outcome)
    }

    fn check_entities(&self, parent: ParentId, entities: &[ChildEntity<P>]) -> SyncResult<()> {
        for entity in entities {
            entity.validate()?;
            if entity.parent_id != parent {
                return Err(SyncError::invalid_input(format!(
                    "'{}' belongs to parent {}, not {}",
                    entity.natural_key, entity.parent_id, parent
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::ChangeType;
    use crate::models::{CustomField, FieldValue};

    fn fields() -> AuditedCollection<FieldValue> {
        AuditedCollection::new(
            Arc::new(Database::in_memory()),
            CollectionConfig::new(ObjectType::CustomField),
        )
    }

    #[test]
    fn test_update_policy_follows_settings() {
        let mut settings = Settings::default();
        assert_eq!(update_policy(&settings), UpdatePolicy::RecordAll);

        settings.skip_unchanged_updates = true;
        assert_eq!(update_policy(&settings), UpdatePolicy::SkipUnchanged);
    }

    #[test]
    fn test_get_all_empty_parent() {
        let collection = fields();
        assert!(collection.get_all(ParentId::new()).unwrap().is_empty());
        assert!(collection.history(ParentId::new()).unwrap().is_empty());
    }

    #[test]
    fn test_save_then_get_is_key_ordered() {
        let collection = fields();
        let parent = ParentId::new();
        let ctx = CallContext::new("tester");

        collection
            .save_all(
                parent,
                vec![
                    CustomField::field(parent, "tier", "gold"),
                    CustomField::field(parent, "region", "eu"),
                ],
                &ctx,
            )
            .unwrap();

        let names: Vec<String> = collection
            .get_all(parent)
            .unwrap()
            .into_iter()
            .map(|f| f.natural_key)
            .collect();
        assert_eq!(names, vec!["region", "tier"]);
    }

    #[test]
    fn test_add_one_replaces_by_key() {
        let collection = fields();
        let parent = ParentId::new();
        let ctx = CallContext::new("tester");
        collection
            .save_all(
                parent,
                vec![
                    CustomField::field(parent, "tier", "gold"),
                    CustomField::field(parent, "region", "eu"),
                ],
                &ctx,
            )
            .unwrap();

        let outcome = collection
            .add_one(parent, CustomField::field(parent, "tier", "silver"), &ctx)
            .unwrap();

        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.changes(), 1);
        let history = collection.history(parent).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].change_type, ChangeType::Update);
        assert_eq!(history[2].natural_key, "tier");
    }

    #[test]
    fn test_remove_absent_key_is_noop() {
        let collection = fields();
        let parent = ParentId::new();
        let ctx = CallContext::new("tester");
        collection
            .add_one(parent, CustomField::field(parent, "tier", "gold"), &ctx)
            .unwrap();

        let outcome = collection
            .remove_one(parent, CustomField::field(parent, "missing", ""), &ctx)
            .unwrap();

        assert_eq!(outcome, SyncOutcome::default());
        assert_eq!(collection.history(parent).unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_foreign_parent_and_empty_actor() {
        let collection = fields();
        let parent = ParentId::new();

        let err = collection
            .save_all(
                parent,
                vec![CustomField::field(ParentId::new(), "tier", "gold")],
                &CallContext::new("tester"),
            )
            .unwrap_err();
        assert!(err.is_invalid_input());

        let err = collection
            .add_one(
                parent,
                CustomField::field(parent, "tier", "gold"),
                &CallContext::new(" "),
            )
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_plan_is_read_only() {
        let collection = fields();
        let parent = ParentId::new();

        let plan = collection
            .plan(parent, vec![CustomField::field(parent, "tier", "gold")])
            .unwrap();

        assert_eq!(plan.inserts.len(), 1);
        assert!(collection.get_all(parent).unwrap().is_empty());
    }

    #[test]
    fn test_save_all_in_composes_with_outer_transaction() {
        let collection = fields();
        let first = ParentId::new();
        let second = ParentId::new();
        let ctx = CallContext::new("tester");

        let err = collection
            .database()
            .run_in_transaction(|tx| {
                collection.save_all_in(
                    tx,
                    first,
                    vec![CustomField::field(first, "tier", "gold")],
                    &ctx,
                )?;
                collection.save_all_in(
                    tx,
                    second,
                    vec![CustomField::field(second, "", "bad")],
                    &ctx,
                )
            })
            .unwrap_err();

        assert!(err.is_invalid_input());
        assert!(collection.get_all(first).unwrap().is_empty());
    }
}
