//! Equivalence resolution
//!
//! Two child entities are the same logical record iff their equivalence keys
//! are equal. Identity is ignored: a freshly built entity without an id must
//! match the persisted row it describes.

use std::fmt;
use std::sync::Arc;

use crate::models::{ChildEntity, Payload};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EquivalenceKey(String);

impl EquivalenceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EquivalenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type KeyFn<P> = dyn Fn(&ChildEntity<P>) -> EquivalenceKey + Send + Sync;

/// Strategy mapping an entity to its equivalence key
pub struct EquivalenceResolver<P> {
    name: &'static str,
    key_fn: Arc<KeyFn<P>>,
}

impl<P: Payload> EquivalenceResolver<P> {
    /// Compare by the natural key exactly as stored
    pub fn natural_key() -> Self {
        Self::from_fn("natural_key", |entity| {
            EquivalenceKey::new(entity.natural_key.clone())
        })
    }

    /// Compare by the trimmed, lowercased natural key
    pub fn case_insensitive() -> Self {
        Self::from_fn("case_insensitive", |entity| {
            EquivalenceKey::new(entity.natural_key.trim().to_lowercase())
        })
    }

    /// Use a custom key extractor
    pub fn from_fn<F>(name: &'static str, key_fn: F) -> Self
    where
        F: Fn(&ChildEntity<P>) -> EquivalenceKey + Send + Sync + 'static,
    {
        Self {
            name,
            key_fn: Arc::new(key_fn),
        }
    }

    pub fn key_of(&self, entity: &ChildEntity<P>) -> EquivalenceKey {
        (self.key_fn)(entity)
    }

    pub fn equivalent(&self, a: &ChildEntity<P>, b: &ChildEntity<P>) -> bool {
        self.key_of(a) == self.key_of(b)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<P> Clone for EquivalenceResolver<P> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<P> fmt::Debug for EquivalenceResolver<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EquivalenceResolver")
            .field("name", &self.name)
            .finish()
    }
}
