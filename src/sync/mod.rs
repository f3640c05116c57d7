//! Collection synchronization engine
//!
//! Leaf-first: the equivalence resolver keys entities, the loader reads a
//! parent's persisted set, `reconcile` plans the changes, and the writer
//! applies them with their audit records inside one transaction.

mod equivalence;
mod loader;
mod plan;
mod writer;

pub use equivalence::{EquivalenceKey, EquivalenceResolver};
pub use loader::{load_entities, KeyedEntities};
pub use plan::{reconcile, PlannedUpdate, SynchronizationPlan};
pub use writer::{apply, SyncOutcome, UpdatePolicy};
