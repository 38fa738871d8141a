//! Reads against committed rows.

use crate::error::{Error, Result};
use crate::models::*;
use crate::native::NativeStore;
use rekord_core::{Record, RecordId};

impl NativeStore {
    /// Committed records of one entity, in id order.
    pub(crate) fn committed_by_entity(&self, entity: &str) -> Result<Vec<Record>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().secondary::<StoredRecord>(StoredRecordKey::entity)?;
        let iter = scan.start_with(entity)?;
        let stored: std::result::Result<Vec<StoredRecord>, _> = iter.collect();
        let mut stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        // prefix scan: "Person" also matches "PersonNote"
        stored.retain(|s| s.entity == entity);
        stored.sort_by_key(|s| s.id);
        stored.iter().map(StoredRecord::to_record).collect()
    }

    /// One committed record.
    pub(crate) fn committed_record(&self, id: RecordId) -> Result<Option<Record>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredRecord> = r.get().primary(id.raw())?;
        stored.as_ref().map(StoredRecord::to_record).transpose()
    }

    /// Next id recorded by the last save, if any.
    pub(crate) fn committed_sequence(&self) -> Result<Option<u64>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredSequence> = r.get().primary(RECORD_SEQUENCE.to_string())?;
        Ok(stored.map(|s| s.next))
    }
}
