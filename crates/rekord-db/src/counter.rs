//! Per-entity auto-increment counters.

use crate::error::Result;
use parking_lot::Mutex;
use ron::ser::PrettyConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Monotonic id counters, one per entity
///
/// With a path, the table is a RON map `entity -> next id` that is re-read
/// before and rewritten after every increment, so several `Counters` over
/// the same file in one process hand out distinct ids. No locking is done
/// across processes.
#[derive(Debug)]
pub struct Counters {
    path: Option<PathBuf>,
    values: Mutex<BTreeMap<String, i64>>,
}

impl Counters {
    /// Counters kept in process memory only
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(BTreeMap::new()),
        }
    }

    /// Counters backed by a RON file, created on first increment
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = read_table(&path)?;
        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// Hand out the next id for an entity and advance its counter
    ///
    /// A fresh counter starts at 0.
    pub fn next(&self, entity: &str) -> Result<i64> {
        let mut values = self.values.lock();
        if let Some(path) = &self.path {
            for (name, stored) in read_table(path)? {
                let current = values.entry(name).or_insert(stored);
                *current = (*current).max(stored);
            }
        }

        let counter = values.entry(entity.to_string()).or_insert(0);
        let id = *counter;
        *counter += 1;

        if let Some(path) = &self.path {
            let text = ron::ser::to_string_pretty(&*values, PrettyConfig::default())?;
            fs::write(path, text)?;
        }
        debug!(entity = %entity, id, "Assigned auto-increment id");
        Ok(id)
    }

    /// The id the next call to [`Counters::next`] would return
    #[cfg(test)]
    pub(crate) fn peek(&self, entity: &str) -> i64 {
        self.values.lock().get(entity).copied().unwrap_or(0)
    }
}

fn read_table(path: &Path) -> Result<BTreeMap<String, i64>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(ron::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let counters = Counters::in_memory();
        assert_eq!(counters.peek("Person"), 0);
        assert_eq!(counters.next("Person").unwrap(), 0);
        assert_eq!(counters.next("Person").unwrap(), 1);
        assert_eq!(counters.next("Pet").unwrap(), 0);
        assert_eq!(counters.peek("Person"), 2);
    }

    #[test]
    fn test_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.ron");

        let first = Counters::open(&path).unwrap();
        assert_eq!(first.next("Person").unwrap(), 0);
        assert_eq!(first.next("Person").unwrap(), 1);
        drop(first);

        let second = Counters::open(&path).unwrap();
        assert_eq!(second.peek("Person"), 2);
        assert_eq!(second.next("Person").unwrap(), 2);
    }

    #[test]
    fn test_shared_file_hands_out_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.ron");
        let a = Counters::open(&path).unwrap();
        let b = Counters::open(&path).unwrap();

        let ids = [
            a.next("Person").unwrap(),
            b.next("Person").unwrap(),
            a.next("Person").unwrap(),
        ];
        assert_eq!(ids, [0, 1, 2]);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.ron");
        fs::write(&path, "{ \"Person\": ").unwrap();
        assert!(matches!(Counters::open(&path), Err(crate::Error::Ron(_))));
    }
}
