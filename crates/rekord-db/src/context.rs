//! The record context: store, caches and configuration in one place.

use crate::config::RekordConfig;
use crate::counter::Counters;
use crate::error::Result;
use crate::facade::EntityHandle;
use crate::fetch::FetchRequest;
use crate::memory::MemoryStore;
use crate::native::NativeStore;
use crate::observer::FieldObserver;
use crate::store::PersistentStore;
use crate::watch::Subscription;
use parking_lot::RwLock;
use rekord_core::{
    Condition, EntitySchema, KeyMapCache, Model, Record, SchemaRegistry, SchemaSet, Sort,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Everything the façade operations need
///
/// Build one per store and pass it by reference. Dropping the context
/// saves staged changes if `save_on_drop` is set; a failed save is logged.
pub struct Context {
    store: RwLock<Arc<dyn PersistentStore>>,
    pub(crate) schemas: SchemaRegistry,
    pub(crate) keys: KeyMapCache,
    pub(crate) counters: Counters,
    config: RekordConfig,
    observers: RwLock<Vec<Arc<dyn FieldObserver>>>,
}

impl Context {
    /// Open the store the configuration names
    ///
    /// A `store_path` opens a [`NativeStore`] there; otherwise records live
    /// in a [`MemoryStore`].
    pub fn open(config: RekordConfig, schemas: SchemaSet) -> Result<Self> {
        let store: Arc<dyn PersistentStore> = match config.store_path() {
            Some(path) => {
                info!(path = %path.display(), "Opening record store");
                Arc::new(NativeStore::open(path, schemas)?)
            }
            None => {
                info!("Using in-memory record store");
                Arc::new(MemoryStore::new(schemas))
            }
        };
        Self::with_store(store, config)
    }

    /// Wrap an existing store
    pub fn with_store(store: Arc<dyn PersistentStore>, config: RekordConfig) -> Result<Self> {
        let counters = match config.counter_path() {
            Some(path) => Counters::open(path)?,
            None => Counters::in_memory(),
        };
        Ok(Self {
            store: RwLock::new(store),
            schemas: SchemaRegistry::new(),
            keys: KeyMapCache::new(),
            counters,
            config,
            observers: RwLock::new(Vec::new()),
        })
    }

    /// The active store
    pub fn store(&self) -> Arc<dyn PersistentStore> {
        self.store.read().clone()
    }

    /// Swap the store, dropping cached schemas and key mappings
    ///
    /// Staged changes on the old store are not saved.
    pub fn replace_store(&self, store: Arc<dyn PersistentStore>) {
        *self.store.write() = store;
        self.schemas.clear();
        self.keys.clear();
        debug!("Replaced record store");
    }

    /// The configuration this context was built with
    pub fn config(&self) -> &RekordConfig {
        &self.config
    }

    /// Resolve an entity schema through the cache
    pub fn schema(&self, entity: &str) -> Result<Arc<EntitySchema>> {
        let store = self.store();
        self.schemas.schema_for(entity, || store.schema(entity))
    }

    /// Register an observer for field assignments
    pub fn add_observer(&self, observer: Arc<dyn FieldObserver>) {
        self.observers.write().push(observer);
    }

    pub(crate) fn observers(&self) -> Vec<Arc<dyn FieldObserver>> {
        self.observers.read().clone()
    }

    /// Façade operations for one entity
    pub fn entity(&self, name: impl Into<String>) -> EntityHandle<'_> {
        EntityHandle::new(self, name.into())
    }

    /// Façade operations for the entity a Rust type stands for
    pub fn model<M: Model>(&self) -> EntityHandle<'_> {
        self.entity(M::entity_name())
    }

    /// Commit staged changes
    ///
    /// `Ok(false)` when there was nothing to save.
    pub fn save(&self) -> Result<bool> {
        let store = self.store();
        if !store.has_changes() {
            return Ok(false);
        }
        match store.save() {
            Ok(()) => {
                debug!("Saved record store");
                Ok(true)
            }
            Err(err) => {
                error!(error = %err, "Failed to save record store");
                Err(err)
            }
        }
    }

    /// Stage removal of one record
    pub fn delete(&self, record: &Record) -> Result<()> {
        self.store().delete(record.id)
    }

    /// Watch the results of a query as the store changes
    pub fn watch(
        &self,
        entity: &str,
        condition: impl Into<Condition>,
        sort: impl Into<Sort>,
    ) -> Result<Subscription> {
        let store = self.store();
        let request = FetchRequest::new(entity)
            .with_predicate(condition.into().compile())
            .with_sort(sort.into().compile(self.config.direction_parsing()));
        let feed = store.subscribe(entity)?;
        Ok(Subscription::new(store, feed, request))
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if !self.config.save_on_drop() {
            return;
        }
        // failures are already logged by save
        let _ = self.save();
    }
}
