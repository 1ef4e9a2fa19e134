//! Lazily populated cache of collection handles.
//!
//! Lookups take the shared lock only. A miss releases it, asks the engine to
//! create-or-open the collection, and then takes the exclusive lock to insert.
//! Two callers missing on the same new name may both reach the engine; the
//! first insert wins and every caller gets the surviving handle back.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::Collection;
use crate::Result;
use crate::StorageEngine;

pub struct CollectionRegistry {
    engine: Arc<dyn StorageEngine>,
    collections: RwLock<HashMap<String, Arc<dyn Collection>>>,
}

impl std::fmt::Debug for CollectionRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CollectionRegistry")
            .field("cached", &self.collections.read().len())
            .finish_non_exhaustive()
    }
}

impl CollectionRegistry {
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self {
            engine,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Open every collection already present in the store.
    pub fn preload(&self) -> Result<usize> {
        let names = self.engine.collection_names()?;
        for name in &names {
            self.resolve(name)?;
        }
        info!(count = names.len(), "preloaded existing collections");
        Ok(names.len())
    }

    pub fn resolve(
        &self,
        name: &str,
    ) -> Result<Arc<dyn Collection>> {
        if let Some(collection) = self.collections.read().get(name) {
            return Ok(collection.clone());
        }

        let opened = self.engine.open_collection(name).map_err(|e| {
            warn!(collection = %name, "failed to open collection: {}", e);
            e
        })?;

        let mut collections = self.collections.write();
        let cached = collections.entry(name.to_string()).or_insert_with(|| {
            debug!(collection = %name, "collection cached");
            opened
        });
        Ok(cached.clone())
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.collections.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.collections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn engine(&self) -> &Arc<dyn StorageEngine> {
        &self.engine
    }
}
