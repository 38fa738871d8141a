//! Rekord DB - stores and the record façade
//!
//! Provides:
//! - The `PersistentStore` seam with in-memory and native_db stores
//! - Fetch requests and per-entity change feeds
//! - Auto-increment counters persisted to RON
//! - `Context`, the entry point for query/create/update/delete helpers
//! - Live query subscriptions

mod config;
mod context;
mod counter;
mod error;
mod facade;
mod feed;
mod fetch;
mod memory;
mod models;
mod native;
mod observer;
mod queries;
mod store;
mod watch;

pub use config::RekordConfig;
pub use context::Context;
pub use counter::Counters;
pub use error::{Error, Result};
pub use facade::EntityHandle;
pub use feed::{ChangeEvent, ChangeFeed, ChangeHub, FeedId};
pub use fetch::FetchRequest;
pub use memory::MemoryStore;
pub use native::NativeStore;
pub use observer::FieldObserver;
pub use store::PersistentStore;
pub use watch::{Snapshots, Subscription};
