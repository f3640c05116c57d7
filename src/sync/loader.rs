//! Collection loader
//!
//! Reads the complete persisted child set of a parent and keys it by
//! equivalence key. Runs against whatever reader it is given, so inside a
//! transaction it sees that transaction's own writes.

use std::collections::BTreeMap;

use super::equivalence::{EquivalenceKey, EquivalenceResolver};
use crate::error::SyncResult;
use crate::models::{ChildEntity, ParentRef, Payload};
use crate::storage::TableReader;

/// Child entities keyed by equivalence key
#[derive(Debug, Clone)]
pub struct KeyedEntities<P> {
    entries: BTreeMap<EquivalenceKey, ChildEntity<P>>,
    /// Persisted rows hidden by another row with the same key
    superseded: Vec<ChildEntity<P>>,
}

impl<P> Default for KeyedEntities<P> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            superseded: Vec::new(),
        }
    }
}

impl<P: Payload> KeyedEntities<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &EquivalenceKey) -> Option<&ChildEntity<P>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &EquivalenceKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace the entity under `key`, returning the previous one
    pub fn upsert(&mut self, key: EquivalenceKey, entity: ChildEntity<P>) -> Option<ChildEntity<P>> {
        self.entries.insert(key, entity)
    }

    pub fn remove(&mut self, key: &EquivalenceKey) -> Option<ChildEntity<P>> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EquivalenceKey, &ChildEntity<P>)> {
        self.entries.iter()
    }

    pub fn superseded(&self) -> &[ChildEntity<P>] {
        &self.superseded
    }

    /// Entities in key order
    pub fn into_values(self) -> Vec<ChildEntity<P>> {
        self.entries.into_values().collect()
    }
}

/// Load every persisted child of `parent`
///
/// A parent without children yields an empty mapping. If two stored rows
/// resolve to the same key (possible after the resolver was changed), the
/// first in id order is kept and the other is reported as superseded.
pub fn load_entities<P: Payload>(
    reader: &impl TableReader,
    parent: ParentRef,
    resolver: &EquivalenceResolver<P>,
) -> SyncResult<KeyedEntities<P>> {
    let mut keyed = KeyedEntities::new();

    for row in reader.live_rows(parent.tables().live, parent.id) {
        let entity = ChildEntity::from_row(&row)?;
        let key = resolver.key_of(&entity);

        if keyed.entries.contains_key(&key) {
            keyed.superseded.push(entity);
        } else {
            keyed.entries.insert(key, entity);
        }
    }

    Ok(keyed)
}
