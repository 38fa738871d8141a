//! native_db-backed store.

use crate::error::{Error, Result};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeHub, FeedId};
use crate::fetch::{self, FetchRequest};
use crate::models::*;
use crate::store::PersistentStore;
use native_db::*;
use parking_lot::Mutex;
use rekord_core::{EntitySchema, Predicate, Record, RecordId, RecordLookup, SchemaSet};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models
        .define::<StoredRecord>()
        .expect("StoredRecord model definition");
    models
        .define::<StoredSequence>()
        .expect("StoredSequence model definition");
    models
});

#[derive(Debug, Default)]
struct Pending {
    upserts: BTreeMap<RecordId, Record>,
    removals: BTreeSet<RecordId>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }
}

#[derive(Debug)]
struct NativeState {
    pending: Pending,
    next_id: u64,
}

/// A store persisting records with native_db.
///
/// Inserts, puts and deletes are held in memory until `save`, which writes
/// them in one transaction along with the id sequence.
pub struct NativeStore {
    pub(crate) db: Database<'static>,
    schemas: SchemaSet,
    state: Mutex<NativeState>,
    hub: ChangeHub,
}

struct NativeLookup<'a> {
    store: &'a NativeStore,
    pending: &'a Pending,
}

impl RecordLookup for NativeLookup<'_> {
    fn lookup(&self, id: RecordId) -> Option<Record> {
        if self.pending.removals.contains(&id) {
            return None;
        }
        if let Some(record) = self.pending.upserts.get(&id) {
            return Some(record.clone());
        }
        self.store.committed_record(id).ok().flatten()
    }
}

impl NativeStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>, schemas: SchemaSet) -> Result<Self> {
        let db = Builder::new()
            .create(&MODELS, path.as_ref())
            .map_err(|e| Error::Database(e.to_string()))?;
        Self::with_db(db, schemas)
    }

    /// Create an in-memory database.
    pub fn in_memory(schemas: SchemaSet) -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Self::with_db(db, schemas)
    }

    fn with_db(db: Database<'static>, schemas: SchemaSet) -> Result<Self> {
        let mut store = Self {
            db,
            schemas,
            state: Mutex::new(NativeState {
                pending: Pending::default(),
                next_id: 1,
            }),
            hub: ChangeHub::new(),
        };
        if let Some(next) = store.committed_sequence()? {
            store.state.get_mut().next_id = next;
        }
        Ok(store)
    }

    /// Committed records overlaid with staged changes.
    fn view(&self, pending: &Pending, entity: &str) -> Result<Vec<Record>> {
        let mut merged: BTreeMap<RecordId, Record> = self
            .committed_by_entity(entity)?
            .into_iter()
            .filter(|r| !pending.removals.contains(&r.id))
            .map(|r| (r.id, r))
            .collect();
        for (id, record) in &pending.upserts {
            if record.entity == entity {
                merged.insert(*id, record.clone());
            }
        }
        Ok(merged.into_values().collect())
    }

    fn resolve(&self, pending: &Pending, id: RecordId) -> Result<Option<Record>> {
        if pending.removals.contains(&id) {
            return Ok(None);
        }
        if let Some(record) = pending.upserts.get(&id) {
            return Ok(Some(record.clone()));
        }
        self.committed_record(id)
    }
}

impl PersistentStore for NativeStore {
    fn schema(&self, entity: &str) -> Result<EntitySchema> {
        Ok(self.schemas.get(entity)?.clone())
    }

    fn execute(&self, request: &FetchRequest) -> Result<Vec<Record>> {
        let state = self.state.lock();
        let candidates = self.view(&state.pending, &request.entity)?;
        let lookup = NativeLookup {
            store: self,
            pending: &state.pending,
        };
        fetch::apply(request, candidates, &lookup)
    }

    fn count(&self, entity: &str, predicate: Option<&Predicate>) -> Result<usize> {
        let state = self.state.lock();
        let candidates = self.view(&state.pending, entity)?;
        let lookup = NativeLookup {
            store: self,
            pending: &state.pending,
        };
        fetch::count(predicate, candidates, &lookup)
    }

    fn get(&self, id: RecordId) -> Result<Option<Record>> {
        let state = self.state.lock();
        self.resolve(&state.pending, id)
    }

    fn insert(&self, entity: &str) -> Result<Record> {
        self.schemas.get(entity)?;
        let record = {
            let mut state = self.state.lock();
            let id = RecordId(state.next_id);
            state.next_id += 1;
            let record = Record::new(id, entity);
            state.pending.upserts.insert(id, record.clone());
            record
        };
        debug!(entity = %entity, id = %record.id, "Staged insert");
        self.hub.publish(entity, ChangeEvent::Inserted(record.id));
        Ok(record)
    }

    fn put(&self, record: &Record) -> Result<()> {
        {
            let mut state = self.state.lock();
            match self.resolve(&state.pending, record.id)? {
                Some(existing) if existing.entity == record.entity => {}
                _ => return Err(Error::NotFound(record.id.to_string())),
            }
            state.pending.upserts.insert(record.id, record.clone());
        }
        self.hub.publish(&record.entity, ChangeEvent::Updated(record.id));
        Ok(())
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        let entity = {
            let mut state = self.state.lock();
            let existing = self
                .resolve(&state.pending, id)?
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            state.pending.upserts.remove(&id);
            state.pending.removals.insert(id);
            existing.entity
        };
        self.hub.publish(&entity, ChangeEvent::Deleted(id));
        Ok(())
    }

    fn has_changes(&self) -> bool {
        !self.state.lock().pending.is_empty()
    }

    fn save(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.pending.is_empty() {
            return Ok(());
        }

        let rw = self.db.rw_transaction()?;
        for record in state.pending.upserts.values() {
            rw.upsert(StoredRecord::from_record(record)?)?;
        }
        for id in &state.pending.removals {
            if let Some(stored) = rw.get().primary::<StoredRecord>(id.raw())? {
                rw.remove(stored)?;
            }
        }
        rw.upsert(StoredSequence {
            name: RECORD_SEQUENCE.to_string(),
            next: state.next_id,
        })?;
        rw.commit()?;

        debug!(
            upserts = state.pending.upserts.len(),
            removals = state.pending.removals.len(),
            "Committed staged changes"
        );
        state.pending = Pending::default();
        Ok(())
    }

    fn subscribe(&self, entity: &str) -> Result<ChangeFeed> {
        self.schemas.get(entity)?;
        Ok(self.hub.subscribe(entity))
    }

    fn unsubscribe(&self, feed: FeedId) {
        self.hub.unsubscribe(feed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rekord_core::{AttributeType, Value};

    fn schemas() -> SchemaSet {
        SchemaSet::new()
            .with(EntitySchema::new("Person").with_attribute("name", AttributeType::String))
            .with(EntitySchema::new("PersonNote").with_attribute("text", AttributeType::String))
    }

    fn stage(store: &NativeStore, entity: &str, key: &str, value: &str) -> Record {
        let mut record = store.insert(entity).unwrap();
        record.set(key, value);
        store.put(&record).unwrap();
        record
    }

    #[test]
    fn test_staged_changes_visible_before_save() {
        let store = NativeStore::in_memory(schemas()).unwrap();
        let ada = stage(&store, "Person", "name", "Ada");
        assert!(store.has_changes());
        assert_eq!(store.get(ada.id).unwrap(), Some(ada.clone()));
        assert_eq!(store.count("Person", None).unwrap(), 1);

        store.save().unwrap();
        assert!(!store.has_changes());
        assert_eq!(store.get(ada.id).unwrap(), Some(ada));
    }

    #[test]
    fn test_entity_scan_is_exact() {
        let store = NativeStore::in_memory(schemas()).unwrap();
        stage(&store, "Person", "name", "Ada");
        stage(&store, "PersonNote", "text", "likes engines");
        store.save().unwrap();

        let people = store.execute(&FetchRequest::new("Person")).unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].get("name"), Some(&Value::from("Ada")));
    }

    #[test]
    fn test_delete_after_save() {
        let store = NativeStore::in_memory(schemas()).unwrap();
        let ada = stage(&store, "Person", "name", "Ada");
        store.save().unwrap();

        store.delete(ada.id).unwrap();
        assert_eq!(store.get(ada.id).unwrap(), None);
        assert_eq!(store.count("Person", None).unwrap(), 0);
        store.save().unwrap();
        assert_eq!(store.get(ada.id).unwrap(), None);
        assert!(matches!(store.delete(ada.id), Err(Error::NotFound(_))));
    }
}
