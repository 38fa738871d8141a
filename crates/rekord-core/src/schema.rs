//! Entity schemas and the per-entity schema cache

use crate::{Error, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Declared storage type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    String,
    Integer16,
    Integer32,
    Integer64,
    Decimal,
    Float,
    Double,
    Boolean,
    Date,
    Binary,
    /// Transformable or otherwise opaque attributes; values are stored verbatim
    Other,
}

impl AttributeType {
    /// Check if this is one of the integer widths
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            AttributeType::Integer16 | AttributeType::Integer32 | AttributeType::Integer64
        )
    }
}

/// A relationship from one entity to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Entity name of the relationship target
    pub destination: String,
    /// Whether the relationship holds a collection of targets
    #[serde(default)]
    pub to_many: bool,
}

/// How one property of an entity is written
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    /// Plain attribute, coerced to its declared type
    Attribute(AttributeType),
    /// Reference to other records
    Relationship(&'a Relationship),
}

/// Attribute and relationship layout of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Entity name
    pub name: String,
    /// Attributes by local name
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeType>,
    /// Relationships by local name
    #[serde(default)]
    pub relationships: IndexMap<String, Relationship>,
    /// Integer attribute filled from the per-entity counter on creation
    #[serde(default)]
    pub auto_increment: Option<String>,
    /// Remote names for local properties (local -> remote)
    #[serde(default)]
    pub mappings: IndexMap<String, String>,
}

impl EntitySchema {
    /// Create an empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            relationships: IndexMap::new(),
            auto_increment: None,
            mappings: IndexMap::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, ty: AttributeType) -> Self {
        self.attributes.insert(name.into(), ty);
        self
    }

    /// Add a to-one relationship
    pub fn with_to_one(mut self, name: impl Into<String>, destination: impl Into<String>) -> Self {
        self.relationships.insert(
            name.into(),
            Relationship {
                destination: destination.into(),
                to_many: false,
            },
        );
        self
    }

    /// Add a to-many relationship
    pub fn with_to_many(mut self, name: impl Into<String>, destination: impl Into<String>) -> Self {
        self.relationships.insert(
            name.into(),
            Relationship {
                destination: destination.into(),
                to_many: true,
            },
        );
        self
    }

    /// Declare the auto-increment attribute
    pub fn with_auto_increment(mut self, attribute: impl Into<String>) -> Self {
        self.auto_increment = Some(attribute.into());
        self
    }

    /// Map a local property to the name a remote payload uses for it
    pub fn with_mapping(mut self, local: impl Into<String>, remote: impl Into<String>) -> Self {
        self.mappings.insert(local.into(), remote.into());
        self
    }

    /// Get the declared type of an attribute
    pub fn attribute(&self, name: &str) -> Option<AttributeType> {
        self.attributes.get(name).copied()
    }

    /// Get a relationship description
    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.get(name)
    }

    /// Check if a name is an attribute or a relationship
    pub fn has_property(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.relationships.contains_key(name)
    }

    /// Look up how a property is written, attributes first
    pub fn field(&self, name: &str) -> Option<Field<'_>> {
        self.attribute(name)
            .map(Field::Attribute)
            .or_else(|| self.relationship(name).map(Field::Relationship))
    }

    /// Check the schema is internally consistent
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = &self.auto_increment {
            match self.attribute(key) {
                Some(ty) if ty.is_integer() => {}
                Some(ty) => {
                    return Err(Error::TypeError {
                        expected: "integer auto-increment attribute".to_string(),
                        got: format!("{:?}", ty),
                    });
                }
                None => {
                    return Err(Error::AttributeNotFound {
                        entity: self.name.clone(),
                        attribute: key.clone(),
                    });
                }
            }
        }
        for local in self.mappings.keys() {
            if !self.has_property(local) {
                return Err(Error::AttributeNotFound {
                    entity: self.name.clone(),
                    attribute: local.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A collection of entity schemas, keyed by entity name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSet {
    entities: IndexMap<String, EntitySchema>,
}

impl SchemaSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema, replacing any previous schema of the same name
    pub fn insert(&mut self, schema: EntitySchema) {
        self.entities.insert(schema.name.clone(), schema);
    }

    /// Builder-style [`SchemaSet::insert`]
    pub fn with(mut self, schema: EntitySchema) -> Self {
        self.insert(schema);
        self
    }

    /// Look up a schema, failing with `SchemaNotFound`
    pub fn get(&self, entity: &str) -> Result<&EntitySchema> {
        self.entities
            .get(entity)
            .ok_or_else(|| Error::SchemaNotFound(entity.to_string()))
    }

    /// Check whether an entity is declared
    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// Iterate all schemas in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    /// Number of declared entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Process-lifetime cache of resolved schemas
///
/// Schemas are assumed static, so entries are never invalidated; the whole
/// cache is dropped only when the owning context swaps its store.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    cache: RwLock<HashMap<String, Arc<EntitySchema>>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a schema, loading it on first use
    ///
    /// The loader runs outside the lock; if two callers race, the first
    /// inserted schema wins and both get the same `Arc`.
    pub fn schema_for<E>(
        &self,
        entity: &str,
        load: impl FnOnce() -> std::result::Result<EntitySchema, E>,
    ) -> std::result::Result<Arc<EntitySchema>, E> {
        if let Some(schema) = self.cache.read().get(entity) {
            return Ok(schema.clone());
        }
        let loaded = Arc::new(load()?);
        let mut cache = self.cache.write();
        Ok(cache.entry(entity.to_string()).or_insert(loaded).clone())
    }

    /// Get a schema only if it is already cached
    pub fn cached(&self, entity: &str) -> Option<Arc<EntitySchema>> {
        self.cache.read().get(entity).cloned()
    }

    /// Drop every cached schema
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}
