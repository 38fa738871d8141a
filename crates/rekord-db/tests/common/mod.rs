#![allow(dead_code)]

use parking_lot::Mutex;
use rekord_core::{EntitySchema, Predicate, Record, RecordId, SchemaSet};
use rekord_db::{
    ChangeFeed, Error, FeedId, FetchRequest, FieldObserver, MemoryStore, PersistentStore, Result,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const CONTACTS: &str = r#"
(
    entities: [
        (
            name: "Person",
            attributes: {
                "id": Integer64,
                "firstName": String,
                "lastName": String,
                "age": Integer16,
                "active": Boolean,
                "born": Date,
                "score": Double,
            },
            relationships: {
                "employer": (destination: "Company"),
                "pets": (destination: "Pet", to_many: true),
            },
            auto_increment: Some("id"),
            mappings: { "firstName": "given_name" },
        ),
        (
            name: "Company",
            attributes: { "name": String },
        ),
        (
            name: "Pet",
            attributes: { "name": String },
        ),
    ],
)
"#;

/// The contacts model used across tests.
pub fn contacts() -> SchemaSet {
    let mut loader = rekord_model::ModelLoader::new();
    loader.load_str(CONTACTS).unwrap();
    loader.finish().unwrap()
}

pub fn person_schema() -> EntitySchema {
    contacts().get("Person").unwrap().clone()
}

/// A memory store whose reads can be made to fail.
pub struct ProbeStore {
    inner: MemoryStore,
    failing: AtomicBool,
    pub unsubscribed: AtomicUsize,
}

impl ProbeStore {
    pub fn new(schemas: SchemaSet) -> Self {
        Self {
            inner: MemoryStore::new(schemas),
            failing: AtomicBool::new(false),
            unsubscribed: AtomicUsize::new(0),
        }
    }

    pub fn fail_reads(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::Execution("disk on fire".to_string()))
        } else {
            Ok(())
        }
    }
}

impl PersistentStore for ProbeStore {
    fn schema(&self, entity: &str) -> Result<EntitySchema> {
        self.inner.schema(entity)
    }

    fn execute(&self, request: &FetchRequest) -> Result<Vec<Record>> {
        self.check()?;
        self.inner.execute(request)
    }

    fn count(&self, entity: &str, predicate: Option<&Predicate>) -> Result<usize> {
        self.check()?;
        self.inner.count(entity, predicate)
    }

    fn get(&self, id: RecordId) -> Result<Option<Record>> {
        self.inner.get(id)
    }

    fn insert(&self, entity: &str) -> Result<Record> {
        self.inner.insert(entity)
    }

    fn put(&self, record: &Record) -> Result<()> {
        self.inner.put(record)
    }

    fn delete(&self, id: RecordId) -> Result<()> {
        self.inner.delete(id)
    }

    fn has_changes(&self) -> bool {
        self.inner.has_changes()
    }

    fn save(&self) -> Result<()> {
        self.inner.save()
    }

    fn subscribe(&self, entity: &str) -> Result<ChangeFeed> {
        self.inner.subscribe(entity)
    }

    fn unsubscribe(&self, feed: FeedId) {
        self.unsubscribed.fetch_add(1, Ordering::SeqCst);
        self.inner.unsubscribe(feed)
    }
}

/// Records observer calls as `will:field=old` / `did:field=new`.
#[derive(Default)]
pub struct Recorder {
    pub calls: Mutex<Vec<String>>,
}

impl FieldObserver for Recorder {
    fn will_change(&self, record: &Record, field: &str) {
        self.calls
            .lock()
            .push(format!("will:{}={}", field, record.get_or_null(field)));
    }

    fn did_change(&self, record: &Record, field: &str) {
        self.calls
            .lock()
            .push(format!("did:{}={}", field, record.get_or_null(field)));
    }
}
