//! Database models for persistent storage.

mod record;

pub use record::*;
