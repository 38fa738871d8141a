//! Record models for database storage.

use crate::error::Result;
use native_db::*;
use native_model::{native_model, Model};
use rekord_core::{Record, RecordId, ValueMap};
use serde::{Deserialize, Serialize};

/// Stored record in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredRecord {
    /// Primary key - record ID.
    #[primary_key]
    pub id: u64,
    /// Entity name.
    #[secondary_key]
    pub entity: String,
    /// Bincode-encoded property map.
    pub properties: Vec<u8>,
}

impl StoredRecord {
    /// Create from a record.
    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.id.raw(),
            entity: record.entity.clone(),
            properties: bincode::serialize(&record.properties)?,
        })
    }

    /// Convert to a record.
    pub fn to_record(&self) -> Result<Record> {
        let properties: ValueMap = bincode::deserialize(&self.properties)?;
        let mut record = Record::new(RecordId::new(self.id), self.entity.clone());
        record.properties = properties;
        Ok(record)
    }
}

/// Name of the record id sequence row.
pub const RECORD_SEQUENCE: &str = "records";

/// Stored id sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredSequence {
    /// Sequence name.
    #[primary_key]
    pub name: String,
    /// Next id to hand out.
    pub next: u64,
}
