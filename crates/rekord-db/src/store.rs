//! The persistent store seam.

use crate::error::Result;
use crate::feed::{ChangeFeed, FeedId};
use crate::fetch::FetchRequest;
use rekord_core::{EntitySchema, Predicate, Record, RecordId};

/// A record store the façade drives.
///
/// Changes made through `insert`, `put` and `delete` are staged: they are
/// visible to later fetches right away and become durable on `save`.
/// Change events are published when a change is staged.
pub trait PersistentStore: Send + Sync {
    /// Schema of one entity.
    fn schema(&self, entity: &str) -> Result<EntitySchema>;

    /// Run a fetch request. Raw condition templates are bound here.
    fn execute(&self, request: &FetchRequest) -> Result<Vec<Record>>;

    /// Count records of an entity matching a predicate.
    fn count(&self, entity: &str, predicate: Option<&Predicate>) -> Result<usize>;

    /// Look up one record by identity.
    fn get(&self, id: RecordId) -> Result<Option<Record>>;

    /// Create an empty record of an entity.
    fn insert(&self, entity: &str) -> Result<Record>;

    /// Stage the current field values of a record.
    fn put(&self, record: &Record) -> Result<()>;

    /// Stage removal of a record.
    fn delete(&self, id: RecordId) -> Result<()>;

    /// Whether anything is staged and not yet saved.
    fn has_changes(&self) -> bool;

    /// Make staged changes durable.
    fn save(&self) -> Result<()>;

    /// Register for change events on one entity.
    fn subscribe(&self, entity: &str) -> Result<ChangeFeed>;

    /// Release a registration.
    fn unsubscribe(&self, feed: FeedId);
}
