//! Persistent record instances

use crate::{RecordId, Value, ValueMap};
use serde::{Deserialize, Serialize};

/// One object of an entity, as held by a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identity
    pub id: RecordId,
    /// The entity this record belongs to
    pub entity: String,
    /// Attribute and relationship values by local name
    pub properties: ValueMap,
}

impl Record {
    /// Create a new, empty record
    pub fn new(id: RecordId, entity: impl Into<String>) -> Self {
        Self {
            id,
            entity: entity.into(),
            properties: ValueMap::new(),
        }
    }

    /// Get a property value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Get a property value or null when unset
    pub fn get_or_null(&self, key: &str) -> Value {
        self.properties.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Set a property value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Clear a property, returning its previous value
    pub fn clear(&mut self, key: &str) -> Option<Value> {
        self.properties.shift_remove(key)
    }

    /// Check whether a property currently holds a non-null value
    pub fn is_set(&self, key: &str) -> bool {
        self.properties.get(key).is_some_and(|v| !v.is_null())
    }

    /// Get a string property
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Get an integer property
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(Value::as_int)
    }

    /// Get the target of a to-one relationship
    pub fn related(&self, key: &str) -> Option<RecordId> {
        self.properties.get(key).and_then(Value::as_record)
    }

    /// Get the targets of a to-many relationship
    pub fn related_many(&self, key: &str) -> Vec<RecordId> {
        self.properties
            .get(key)
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_record).collect())
            .unwrap_or_default()
    }
}

/// Read access to records by identity, used to follow relationship key paths
pub trait RecordLookup {
    /// Look up a record by its store identity
    fn lookup(&self, id: RecordId) -> Option<Record>;
}

/// A lookup that never resolves anything
///
/// Key paths through relationships evaluate to null against it.
pub struct NoLookup;

impl RecordLookup for NoLookup {
    fn lookup(&self, _id: RecordId) -> Option<Record> {
        None
    }
}
