//! ActiveRecord-style operations over a [`Context`].
//!
//! Fetches (`all`, `query`, `find`) never fail: a store error is logged and
//! an empty result returned. Counting, creating, updating and saving
//! report errors to the caller.

use crate::context::Context;
use crate::error::Result;
use crate::fetch::FetchRequest;
use rekord_core::{
    coerce, Coerced, Condition, EntitySchema, Field, Record, RecordId, Relationship, Sort,
    Value, ValueMap,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Operations on the records of one entity
pub struct EntityHandle<'a> {
    ctx: &'a Context,
    entity: String,
}

impl<'a> EntityHandle<'a> {
    pub(crate) fn new(ctx: &'a Context, entity: String) -> Self {
        Self { ctx, entity }
    }

    /// Entity name
    pub fn name(&self) -> &str {
        &self.entity
    }

    /// Schema of the entity
    pub fn schema(&self) -> Result<Arc<EntitySchema>> {
        self.ctx.schema(&self.entity)
    }

    /// Every record, optionally sorted
    pub fn all(&self, sort: impl Into<Sort>) -> Vec<Record> {
        self.fetch(self.request(Condition::all(), sort.into(), None))
    }

    /// Records matching a condition
    ///
    /// ```
    /// use rekord_core::{props, AttributeType, EntitySchema, SchemaSet};
    /// use rekord_db::{Context, RekordConfig};
    ///
    /// let schemas = SchemaSet::new().with(
    ///     EntitySchema::new("Person")
    ///         .with_attribute("name", AttributeType::String)
    ///         .with_attribute("age", AttributeType::Integer32),
    /// );
    /// let ctx = Context::open(RekordConfig::default(), schemas).unwrap();
    /// let people = ctx.entity("Person");
    /// people.create_with(&props! { "name" => "Ada", "age" => "36" }).unwrap();
    /// people.create_with(&props! { "name" => "Bob", "age" => 25 }).unwrap();
    ///
    /// let adults = people.query("age > 30", "name", None);
    /// assert_eq!(adults.len(), 1);
    /// assert_eq!(adults[0].get_str("name"), Some("Ada"));
    /// ```
    pub fn query(
        &self,
        condition: impl Into<Condition>,
        sort: impl Into<Sort>,
        limit: Option<usize>,
    ) -> Vec<Record> {
        self.fetch(self.request(condition.into(), sort.into(), limit))
    }

    /// The first record matching a condition
    pub fn find(&self, condition: impl Into<Condition>, sort: impl Into<Sort>) -> Option<Record> {
        self.query(condition, sort, Some(1)).into_iter().next()
    }

    /// Number of records matching a condition
    ///
    /// Unlike the fetches, a store failure here is returned.
    pub fn count(&self, condition: impl Into<Condition>) -> Result<usize> {
        self.schema()?;
        let predicate = condition.into().compile();
        self.ctx.store().count(&self.entity, predicate.as_ref())
    }

    /// Insert an empty record, assigning the next auto-increment id
    pub fn create(&self) -> Result<Record> {
        let schema = self.schema()?;
        let mut record = self.ctx.store().insert(&self.entity)?;
        let filled = match &schema.auto_increment {
            Some(key) => self.assign_next_id(&mut record, key),
            None => Ok(()),
        };
        self.keep_or_discard(record, filled)
    }

    /// Insert a record and apply properties to it
    ///
    /// The auto-increment id is assigned only when the properties did not
    /// supply one.
    pub fn create_with(&self, properties: &ValueMap) -> Result<Record> {
        let schema = self.schema()?;
        let mut record = self.ctx.store().insert(&self.entity)?;
        let filled = self.ctx.update(&mut record, properties).and_then(|()| {
            match &schema.auto_increment {
                Some(key) if !record.is_set(key) => self.assign_next_id(&mut record, key),
                _ => Ok(()),
            }
        });
        self.keep_or_discard(record, filled)
    }

    /// Find a record equal on every given property, or create one
    pub fn find_or_create(&self, properties: &ValueMap) -> Result<Record> {
        let schema = self.schema()?;
        let equalities: ValueMap = self
            .ctx
            .transform(&schema, properties)?
            .into_iter()
            .map(|(field, value)| match value {
                Coerced::Set(v) => (field, v),
                Coerced::Unset => (field, Value::Null),
            })
            .collect();

        if let Some(found) = self.find(equalities.clone(), Sort::Unsorted) {
            return Ok(found);
        }
        self.create_with(&equalities)
    }

    /// Stage removal of every record, returning how many there were
    pub fn delete_all(&self) -> Result<usize> {
        let records = self.all(Sort::Unsorted);
        let store = self.ctx.store();
        for record in &records {
            store.delete(record.id)?;
        }
        Ok(records.len())
    }

    fn request(&self, condition: Condition, sort: Sort, limit: Option<usize>) -> FetchRequest {
        FetchRequest::new(self.entity.clone())
            .with_predicate(condition.compile())
            .with_sort(sort.compile(self.ctx.config().direction_parsing()))
            .with_limit(limit)
    }

    fn fetch(&self, request: FetchRequest) -> Vec<Record> {
        match self.ctx.store().execute(&request) {
            Ok(records) => records,
            Err(err) => {
                error!(entity = %self.entity, error = %err, "Fetch failed");
                Vec::new()
            }
        }
    }

    /// Unstage a freshly inserted record whose fill-in failed
    fn keep_or_discard(&self, record: Record, filled: Result<()>) -> Result<Record> {
        if let Err(err) = filled {
            if let Err(cleanup) = self.ctx.store().delete(record.id) {
                warn!(entity = %self.entity, record = %record.id, error = %cleanup, "Failed to discard partial record");
            }
            return Err(err);
        }
        Ok(record)
    }

    fn assign_next_id(&self, record: &mut Record, key: &str) -> Result<()> {
        let id = self.ctx.counters.next(&self.entity)?;
        self.ctx.assign(record, key, Coerced::Set(Value::Int(id)));
        self.ctx.store().put(record)
    }
}

impl Context {
    /// Apply a property bag to a record and stage it
    ///
    /// Keys are mapped from remote to local names, relationship values are
    /// resolved, and attribute values are coerced to their declared types.
    /// Properties the schema does not know are dropped. An empty bag does
    /// nothing.
    pub fn update(&self, record: &mut Record, properties: &ValueMap) -> Result<()> {
        if properties.is_empty() {
            return Ok(());
        }
        let schema = self.schema(&record.entity)?;
        for (field, value) in self.transform(&schema, properties)? {
            self.assign(record, &field, value);
        }
        self.store().put(record)
    }

    /// One field write, bracketed by observer calls
    fn assign(&self, record: &mut Record, field: &str, value: Coerced) {
        let observers = self.observers();
        for observer in &observers {
            observer.will_change(record, field);
        }
        match value {
            Coerced::Set(v) => record.set(field, v),
            Coerced::Unset => {
                record.clear(field);
            }
        }
        for observer in &observers {
            observer.did_change(record, field);
        }
    }

    /// Map a property bag to local fields and the values to write
    pub(crate) fn transform(
        &self,
        schema: &EntitySchema,
        properties: &ValueMap,
    ) -> Result<Vec<(String, Coerced)>> {
        let mut out = Vec::with_capacity(properties.len());
        for (remote, raw) in properties {
            let local = self.keys.local_key(schema, remote);
            match schema.field(&local) {
                Some(Field::Attribute(ty)) => out.push((local, coerce(raw.clone(), ty))),
                Some(Field::Relationship(rel)) => {
                    if let Some(value) = self.relationship_value(schema, &local, rel, raw)? {
                        out.push((local, value));
                    }
                }
                None => {
                    debug!(entity = %schema.name, property = %remote, "Dropping unknown property")
                }
            }
        }
        Ok(out)
    }

    fn relationship_value(
        &self,
        schema: &EntitySchema,
        name: &str,
        rel: &Relationship,
        raw: &Value,
    ) -> Result<Option<Coerced>> {
        if raw.is_null() {
            return Ok(Some(Coerced::Unset));
        }

        if !rel.to_many {
            return Ok(match self.relationship_target(&rel.destination, raw)? {
                Some(id) => Some(Coerced::Set(Value::Record(id))),
                None => {
                    debug!(entity = %schema.name, relationship = %name, "Skipping invalid to-one value");
                    None
                }
            });
        }

        let Some(items) = raw.as_list() else {
            debug!(entity = %schema.name, relationship = %name, "Skipping non-list to-many value");
            return Ok(None);
        };
        let mut targets = Vec::with_capacity(items.len());
        for item in items {
            match self.relationship_target(&rel.destination, item)? {
                Some(id) => targets.push(Value::Record(id)),
                None => {
                    debug!(entity = %schema.name, relationship = %name, "Skipping invalid to-many element")
                }
            }
        }
        if targets.is_empty() && !items.is_empty() {
            return Ok(None);
        }
        Ok(Some(Coerced::Set(Value::List(targets))))
    }

    /// Resolve one relationship value to a record id
    ///
    /// Ids pass through; nested maps become records via find-or-create
    /// when relationship generation is on.
    fn relationship_target(&self, destination: &str, value: &Value) -> Result<Option<RecordId>> {
        match value {
            Value::Record(id) => Ok(Some(*id)),
            Value::Map(map) if self.config().generate_relationships() => {
                Ok(Some(self.entity(destination).find_or_create(map)?.id))
            }
            _ => Ok(None),
        }
    }
}
