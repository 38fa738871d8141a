//! Rekord Core - schema-aware conditions, ordering and coercion
//!
//! This crate holds everything the record façade needs that does not touch
//! a store:
//! - Dynamic value types (`Value`, `ValueMap`) and records
//! - Entity schemas and the process-lifetime schema cache
//! - Remote-to-local key mapping
//! - The predicate language and condition normalization
//! - Sort specification parsing
//! - Type-coercing assignment of loose values to declared attributes

pub mod coerce;
mod condition;
mod error;
mod identity;
mod keymap;
mod model;
pub mod naming;
mod ordering;
mod parser;
mod predicate;
mod record;
mod schema;
mod value;

pub use coerce::{coerce, Coerced};
pub use condition::Condition;
pub use error::{Error, Result};
pub use identity::RecordId;
pub use keymap::KeyMapCache;
pub use model::Model;
pub use naming::{camel_case, entity_name, entity_name_of};
pub use ordering::{DirectionParsing, Sort, SortKey, SortSpec};
pub use predicate::{CompareOp, EvalContext, Operand, Predicate};
pub use record::{NoLookup, Record, RecordLookup};
pub use schema::{AttributeType, EntitySchema, Field, Relationship, SchemaRegistry, SchemaSet};
pub use value::{Value, ValueMap};
