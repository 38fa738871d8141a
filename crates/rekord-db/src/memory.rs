//! In-process store.

use crate::error::{Error, Result};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeHub, FeedId};
use crate::fetch::{self, FetchRequest};
use crate::store::PersistentStore;
use parking_lot::Mutex;
use rekord_core::{EntitySchema, Predicate, Record, RecordId, RecordLookup, SchemaSet};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug)]
struct MemoryState {
    records: BTreeMap<RecordId, Record>,
    next_id: u64,
    dirty: bool,
}

struct MapLookup<'a>(&'a BTreeMap<RecordId, Record>);

impl RecordLookup for MapLookup<'_> {
    fn lookup(&self, id: RecordId) -> Option<Record> {
        self.0.get(&id).cloned()
    }
}

/// A store that keeps every record in process memory.
///
/// `save` only clears the change flag; nothing outlives the store.
#[derive(Debug)]
pub struct MemoryStore {
    schemas: SchemaSet,
    state: Mutex<MemoryState>,
    hub: ChangeHub,
}

impl MemoryStore {
    /// Create an empty store serving the given schemas.
    pub fn new(schemas: SchemaSet) -> Self {
        Self {
            schemas,
            state: Mutex::new(MemoryState {
                records: BTreeMap::new(),
                next_id: 1,
                dirty: false,
            }),
            hub: ChangeHub::new(),
        }
    }

    /// Number of records across all entities.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    fn candidates(records: &BTreeMap<RecordId, Record>, entity: &str) -> Vec<Record> {
        records
            .values()
            .filter(|r| r.entity == entity)
            .cloned()
            .collect()
    }
}

impl PersistentStore for MemoryStore {
    fn schema(&self, entity: &str) -> Result<EntitySchema> {
        Ok(self.schemas.get(entity)?.clone())
    }

    fn execute(&self, request: &FetchRequest) -> Result<Vec<Record>> {
        let state = self.state.lock();
        let candidates = Self::candidates(&state.records, &request.entity);
        fetch::apply(request, candidates, &MapLookup(&state.records))
    }

    fn count(&self, entity: &str, predicate: Option<&Predicate>) -> Result<usize> {
        let state = self.state.lock();
        let candidates = Self::candidates(&state.records, entity);
        fetch::count(predicate, candidates, &MapLookup(&state.records))
    }

    fn get(&self, id: RecordId) -> Result<Option<Record>> {
        Ok(self.state.lock().records.get(&id).cloned())
    }

    fn insert(&self, entity: &str) -> Result<Record> {
        self.schemas.get(entity)?;
        let record = {
            let mut state = self.state.lock();
            let id = RecordId(state.next_id);
            state.next_id += 1;
            let record = Record::new(id, entity);
            state.records.insert(id, record.clone());
            state.dirty = true;
            record
        };
        debug!(entity = %entity, id = %record.id, "Inserted record");
        self.hub.publish(entity, ChangeEvent::Inserted(record.id));
        Ok(record)
    }

    fn put(&self, record: &Record) -> Result<()> {
        {
            let mut state = self.state.lock();
            match state.records.get_mut(&record.id) {
                Some(existing) if existing.entity == record.entity => {
                    existing.properties = record.properties.clone();
                }
                _ => return Err(Error::NotFound(record.id.to_string())),
            }
            state.dirty = true;
        }
        self.hub.publish(&record.entity, ChangeEvent::Updated(record.id));
        Ok(())
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        let removed = {
            let mut state = self.state.lock();
            let removed = state
                .records
                .remove(&id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            state.dirty = true;
            removed
        };
        self.hub.publish(&removed.entity, ChangeEvent::Deleted(id));
        Ok(())
    }

    fn has_changes(&self) -> bool {
        self.state.lock().dirty
    }

    fn save(&self) -> Result<()> {
        self.state.lock().dirty = false;
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

    fn store() -> MemoryStore {
        MemoryStore::new(
            SchemaSet::new()
                .with(
                    EntitySchema::new("Person")
                        .with_attribute("name", AttributeType::String)
                        .with_to_one("employer", "Company"),
                )
                .with(EntitySchema::new("Company").with_attribute("name", AttributeType::String)),
        )
    }

    fn named(store: &MemoryStore, entity: &str, name: &str) -> Record {
        let mut record = store.insert(entity).unwrap();
        record.set("name", name);
        store.put(&record).unwrap();
        record
    }

    #[test]
    fn test_insert_put_get() {
        let store = store();
        assert!(!store.has_changes());

        let ada = named(&store, "Person", "Ada");
        assert!(store.has_changes());
        assert_eq!(store.get(ada.id).unwrap(), Some(ada.clone()));

        store.save().unwrap();
        assert!(!store.has_changes());
    }

    #[test]
    fn test_unknown_entity() {
        let store = store();
        assert!(matches!(
            store.insert("Robot"),
            Err(Error::Core(rekord_core::Error::SchemaNotFound(_)))
        ));
    }

    #[test]
    fn test_put_missing_record() {
        let store = store();
        let ghost = Record::new(RecordId(99), "Person");
        assert!(matches!(store.put(&ghost), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_execute_follows_relationships() {
        let store = store();
        let acme = named(&store, "Company", "Acme");
        let mut ada = named(&store, "Person", "Ada");
        ada.set("employer", acme.id);
        store.put(&ada).unwrap();
        named(&store, "Person", "Bob");

        let request = FetchRequest::new("Person").with_predicate(Some(Predicate::template(
            "employer.name == %@",
            vec![Value::from("Acme")],
        )));
        let found = store.execute(&request).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("name"), Some("Ada"));
        assert_eq!(store.count("Person", None).unwrap(), 2);
    }

    #[test]
    fn test_events() {
        let store = store();
        let feed = store.subscribe("Person").unwrap();
        let ada = named(&store, "Person", "Ada");
        named(&store, "Company", "Acme");
        store.delete(ada.id).unwrap();

        assert_eq!(
            feed.drain(),
            vec![
                ChangeEvent::Inserted(ada.id),
                ChangeEvent::Updated(ada.id),
                ChangeEvent::Deleted(ada.id),
            ]
        );
        store.unsubscribe(feed.id());
        assert_eq!(feed.recv(), None);
    }
}
