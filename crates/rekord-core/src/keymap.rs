//! Remote-to-local property name resolution

use crate::naming::camel_case;
use crate::EntitySchema;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Per-entity cache of remote key -> local key
///
/// Seeded from the schema's mapping table (stored local -> remote, inverted
/// here). Misses fall back to the remote key itself when it names a
/// property, then to its camel-cased form, then to the remote key verbatim.
/// Every resolution is remembered for the lifetime of the cache.
#[derive(Debug, Default)]
pub struct KeyMapCache {
    entities: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl KeyMapCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a remote key against a schema
    pub fn local_key(&self, schema: &EntitySchema, remote: &str) -> String {
        let mut entities = self.entities.lock();
        let table = entities.entry(schema.name.clone()).or_insert_with(|| {
            schema
                .mappings
                .iter()
                .map(|(local, remote)| (remote.clone(), local.clone()))
                .collect()
        });

        if let Some(local) = table.get(remote) {
            return local.clone();
        }

        let local = if schema.has_property(remote) {
            remote.to_string()
        } else {
            let camel = camel_case(remote);
            if schema.has_property(&camel) {
                camel
            } else {
                remote.to_string()
            }
        };
        table.insert(remote.to_string(), local.clone());
        local
    }

    /// Drop every cached table
    pub fn clear(&self) {
        self.entities.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AttributeType;

    fn schema() -> EntitySchema {
        EntitySchema::new("Person")
            .with_attribute("firstName", AttributeType::String)
            .with_attribute("email", AttributeType::String)
            .with_attribute("remoteId", AttributeType::Integer64)
            .with_mapping("remoteId", "id")
    }

    #[test]
    fn test_resolution_order() {
        let cache = KeyMapCache::new();
        let schema = schema();

        // explicit mapping wins
        assert_eq!(cache.local_key(&schema, "id"), "remoteId");
        // identity
        assert_eq!(cache.local_key(&schema, "email"), "email");
        // camel case
        assert_eq!(cache.local_key(&schema, "first_name"), "firstName");
        // unknown passes through
        assert_eq!(cache.local_key(&schema, "shoe_size"), "shoe_size");
    }

    #[test]
    fn test_resolution_is_cached() {
        let cache = KeyMapCache::new();
        let schema = schema();
        assert_eq!(cache.local_key(&schema, "first_name"), "firstName");

        // Even if the schema changes shape, the cached answer sticks
        let changed = EntitySchema::new("Person").with_attribute("first_name", AttributeType::String);
        assert_eq!(cache.local_key(&changed, "first_name"), "firstName");

        cache.clear();
        assert_eq!(cache.local_key(&changed, "first_name"), "first_name");
    }
}
