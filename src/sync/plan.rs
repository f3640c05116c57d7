//! Collection synchronizer
//!
//! Computes the inserts, updates and deletes that turn a persisted child set
//! into a desired one. Matching is by equivalence key only.

use std::collections::BTreeMap;

use super::equivalence::{EquivalenceKey, EquivalenceResolver};
use super::loader::KeyedEntities;
use crate::models::{ChildEntity, Payload};

/// An existing row about to be overwritten
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate<P> {
    pub key: EquivalenceKey,
    pub current: ChildEntity<P>,
    /// Desired state, carrying the identity of `current`
    pub desired: ChildEntity<P>,
}

impl<P: Payload> PlannedUpdate<P> {
    /// True when writing `desired` would not change the stored row
    pub fn is_noop(&self) -> bool {
        self.current.payload == self.desired.payload
            && self.current.natural_key == self.desired.natural_key
    }
}

/// Changes needed to reconcile one parent's collection
#[derive(Debug, Clone, PartialEq)]
pub struct SynchronizationPlan<P> {
    pub inserts: Vec<ChildEntity<P>>,
    pub updates: Vec<PlannedUpdate<P>>,
    pub deletes: Vec<ChildEntity<P>>,
}

impl<P> Default for SynchronizationPlan<P> {
    fn default() -> Self {
        Self {
            inserts: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }
}

impl<P: Payload> SynchronizationPlan<P> {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Total number of planned row writes
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    pub fn noop_updates(&self) -> usize {
        self.updates.iter().filter(|u| u.is_noop()).count()
    }

    /// Keep only the changes to `touched`
    ///
    /// Single-item operations carry the rest of the collection over verbatim.
    /// Superseded rows under other keys stay where they are until a bulk save
    /// or a change to their own key.
    pub fn only_touching(
        mut self,
        touched: &EquivalenceKey,
        resolver: &EquivalenceResolver<P>,
    ) -> Self {
        self.inserts.retain(|e| &resolver.key_of(e) == touched);
        self.updates.retain(|u| &u.key == touched);
        self.deletes.retain(|e| &resolver.key_of(e) == touched);
        self
    }
}

/// Compute the plan that turns `persisted` into `desired`
///
/// Desired entities sharing a key collapse to the last one in input order.
/// Rows the loader reported as superseded are always deleted.
pub fn reconcile<P: Payload>(
    persisted: &KeyedEntities<P>,
    desired: impl IntoIterator<Item = ChildEntity<P>>,
    resolver: &EquivalenceResolver<P>,
) -> SynchronizationPlan<P> {
    let mut wanted: BTreeMap<EquivalenceKey, ChildEntity<P>> = BTreeMap::new();
    for entity in desired {
        wanted.insert(resolver.key_of(&entity), entity);
    }

    let mut plan = SynchronizationPlan::default();

    for (key, entity) in wanted.iter() {
        match persisted.get(key) {
            None => plan.inserts.push(entity.clone()),
            Some(current) => {
                let mut desired = entity.clone();
                desired.id = current.id;
                plan.updates.push(PlannedUpdate {
                    key: key.clone(),
                    current: current.clone(),
                    desired,
                });
            }
        }
    }

    for (key, current) in persisted.iter() {
        if !wanted.contains_key(key) {
            plan.deletes.push(current.clone());
        }
    }
    plan.deletes.extend(persisted.superseded().iter().cloned());

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountEmail, EmailAddress, EntityId, ParentId};

    fn persisted(account: ParentId, addresses: &[&str]) -> KeyedEntities<EmailAddress> {
        let resolver = EquivalenceResolver::natural_key();
        let mut keyed = KeyedEntities::new();
        for address in addresses {
            let entity = AccountEmail::email(account, *address).with_id(EntityId::new());
            keyed.upsert(resolver.key_of(&entity), entity);
        }
        keyed
    }

    fn keys(entities: &[AccountEmail]) -> Vec<&str> {
        entities.iter().map(|e| e.natural_key.as_str()).collect()
    }

    #[test]
    fn test_insert_update_delete_partition() {
        let account = ParentId::new();
        let current = persisted(account, &["a@x.com", "b@x.com"]);
        let desired = vec![
            AccountEmail::email(account, "b@x.com"),
            AccountEmail::email(account, "c@x.com"),
        ];

        let plan = reconcile(&current, desired, &EquivalenceResolver::natural_key());

        assert_eq!(keys(&plan.inserts), vec!["c@x.com"]);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].key.as_str(), "b@x.com");
        assert_eq!(keys(&plan.deletes), vec!["a@x.com"]);
    }

    #[test]
    fn test_update_preserves_identity() {
        let account = ParentId::new();
        let current = persisted(account, &["a@x.com"]);
        let stored_id = current.iter().next().unwrap().1.id;

        let plan = reconcile(
            &current,
            vec![AccountEmail::email(account, "a@x.com")],
            &EquivalenceResolver::natural_key(),
        );

        assert_eq!(plan.updates[0].desired.id, stored_id);
        assert!(plan.updates[0].is_noop());
        assert_eq!(plan.noop_updates(), 1);
    }

    #[test]
    fn test_duplicate_desired_keys_last_wins() {
        let account = ParentId::new();
        let mut first = AccountEmail::email(account, "a@x.com");
        first.payload = EmailAddress::new("first@x.com");
        let mut second = AccountEmail::email(account, "a@x.com");
        second.payload = EmailAddress::new("second@x.com");

        let plan = reconcile(
            &KeyedEntities::new(),
            vec![first, second],
            &EquivalenceResolver::natural_key(),
        );

        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].payload.address, "second@x.com");
    }

    #[test]
    fn test_empty_desired_deletes_everything() {
        let account = ParentId::new();
        let current = persisted(account, &["a@x.com", "b@x.com", "c@x.com"]);

        let plan = reconcile(&current, Vec::new(), &EquivalenceResolver::natural_key());

        assert!(plan.inserts.is_empty());
        assert!(plan.updates.is_empty());
        assert_eq!(plan.deletes.len(), 3);
    }

    #[test]
    fn test_only_touching_keeps_touched_noop() {
        let account = ParentId::new();
        let current = persisted(account, &["a@x.com", "b@x.com"]);
        let plan = reconcile(
            &current,
            vec![
                AccountEmail::email(account, "a@x.com"),
                AccountEmail::email(account, "b@x.com"),
            ],
            &EquivalenceResolver::natural_key(),
        );
        assert_eq!(plan.len(), 2);

        let touched = EquivalenceKey::new("b@x.com");
        let plan = plan.only_touching(&touched, &EquivalenceResolver::natural_key());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].key, touched);
    }

    #[test]
    fn test_only_touching_drops_changes_to_other_keys() {
        let account = ParentId::new();
        let resolver = EquivalenceResolver::natural_key();
        let current = persisted(account, &["a@x.com", "b@x.com"]);
        let plan = reconcile(
            &current,
            vec![
                AccountEmail::email(account, "b@x.com"),
                AccountEmail::email(account, "c@x.com"),
            ],
            &resolver,
        );
        assert_eq!(plan.len(), 3);

        let plan = plan.only_touching(&EquivalenceKey::new("zzz@x.com"), &resolver);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_case_change_is_update_under_folding_resolver() {
        let account = ParentId::new();
        let resolver = EquivalenceResolver::case_insensitive();
        let mut current = KeyedEntities::new();
        let stored = AccountEmail::email(account, "jane@x.com").with_id(EntityId::new());
        current.upsert(resolver.key_of(&stored), stored);

        let plan = reconcile(
            &current,
            vec![AccountEmail::email(account, "Jane@X.com")],
            &resolver,
        );

        assert!(plan.inserts.is_empty() && plan.deletes.is_empty());
        assert!(!plan.updates[0].is_noop());
    }
}
