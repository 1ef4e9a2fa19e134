use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;
use tracing::info;
use tracing::warn;

use super::SledCollection;
use crate::constants::SLED_DEFAULT_TREE;
use crate::constants::SLED_RESERVED_PREFIX;
use crate::Collection;
use crate::Result;
use crate::StorageEngine;
use crate::StorageError;

/// Sled backed store: one tree per collection.
pub struct SledStorageEngine {
    db: sled::Db,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for SledStorageEngine {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledStorageEngine")
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl SledStorageEngine {
    pub fn new(db: sled::Db) -> Self {
        Self {
            db,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open (or create) the database directory at `path`.
    pub fn open(path: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        let db = init_sled_collection_db(&path)?;
        info!("opened value store at {:?}", path);
        Ok(Self::new(db))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed.into());
        }
        Ok(())
    }
}

impl StorageEngine for SledStorageEngine {
    fn open_collection(
        &self,
        name: &str,
    ) -> Result<Arc<dyn Collection>> {
        self.ensure_open()?;

        if name.starts_with(SLED_RESERVED_PREFIX) {
            return Err(StorageError::CollectionOpen {
                name: name.to_string(),
                reason: "reserved collection name".to_string(),
            }
            .into());
        }

        let tree = self.db.open_tree(name).map_err(|e| StorageError::CollectionOpen {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        debug!(collection = %name, "collection opened");

        Ok(Arc::new(SledCollection::new(
            self.db.clone(),
            tree,
            self.closed.clone(),
        )))
    }

    fn collection_names(&self) -> Result<Vec<String>> {
        self.ensure_open()?;

        Ok(self
            .db
            .tree_names()
            .into_iter()
            .filter(|name| &**name != SLED_DEFAULT_TREE)
            .map(|name| String::from_utf8_lossy(&name).into_owned())
            .collect())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let flushed = self.db.flush()?;
        info!(bytes = flushed, "value store flushed and closed");
        Ok(())
    }
}

pub fn init_sled_collection_db(
    sled_db_path: impl AsRef<Path> + std::fmt::Debug
) -> std::result::Result<sled::Db, std::io::Error> {
    debug!("init_sled_collection_db from path: {:?}", &sled_db_path);

    let path = sled_db_path.as_ref();
    sled::Config::default()
        .path(path)
        .cache_capacity(64 * 1024 * 1024) //64MB
        .flush_every_ms(Some(100))
        .use_compression(true)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                path, e
            );
            std::io::Error::other(e)
        })
}
