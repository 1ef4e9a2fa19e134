//! Record primitives over a single sled tree.
//!
//! Keys are ids from [`sled::Db::generate_id`] in big-endian form, so a tree
//! iterates in insertion order. Values are JSON documents.
//!
//! `take_values` and `update` replace each record with compare-and-swap: when
//! two callers race on the same record only one of them removes or rewrites
//! it, and the loser skips it.
//!
//! A collection shares its engine's closed flag and fails every call once the
//! engine is closed.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::Collection;
use crate::Predicate;
use crate::Result;
use crate::StorageError;
use crate::Transform;

pub struct SledCollection {
    db: sled::Db,
    tree: sled::Tree,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for SledCollection {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledCollection")
            .field("name", &String::from_utf8_lossy(&self.tree.name()))
            .field("len", &self.tree.len())
            .finish()
    }
}

impl SledCollection {
    pub(crate) fn new(
        db: sled::Db,
        tree: sled::Tree,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self { db, tree, closed }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed.into());
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Decoded records; undecodable entries are logged and skipped.
    fn records(&self) -> impl Iterator<Item = Result<(sled::IVec, sled::IVec, Value)>> + '_ {
        self.tree.iter().filter_map(|item| match item {
            Ok((key, raw)) => match serde_json::from_slice::<Value>(&raw) {
                Ok(value) => Some(Ok((key, raw, value))),
                Err(e) => {
                    warn!(key = ?key, "skipping undecodable record: {:?}", e);
                    None
                }
            },
            Err(e) => Some(Err(StorageError::from(e).into())),
        })
    }
}

impl Collection for SledCollection {
    fn put_value(
        &self,
        value: Value,
    ) -> Result<()> {
        self.ensure_open()?;
        let id = self.db.generate_id()?;
        let encoded = serde_json::to_vec(&value).map_err(StorageError::from)?;
        self.tree.insert(id.to_be_bytes(), encoded)?;
        Ok(())
    }

    fn get_values(
        &self,
        filter: &Predicate,
    ) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let mut matched = Vec::new();
        for record in self.records() {
            let (_, _, value) = record?;
            if filter.matches(&value) {
                matched.push(value);
            }
        }
        Ok(matched)
    }

    fn take_values(
        &self,
        filter: &Predicate,
    ) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let mut taken = Vec::new();
        for record in self.records() {
            let (key, raw, value) = record?;
            if !filter.matches(&value) {
                continue;
            }

            match self.tree.compare_and_swap(&key, Some(&raw), None::<&[u8]>)? {
                Ok(()) => taken.push(value),
                Err(_) => debug!(key = ?key, "record changed concurrently, not taken"),
            }
        }
        Ok(taken)
    }

    fn update(
        &self,
        transform: &Transform,
    ) -> Result<bool> {
        self.ensure_open()?;
        let mut changed = false;
        for record in self.records() {
            let (key, raw, value) = record?;
            let Some(new_value) = transform.apply(&value) else {
                continue;
            };
            if new_value == value {
                continue;
            }

            let encoded = serde_json::to_vec(&new_value).map_err(StorageError::from)?;
            match self.tree.compare_and_swap(&key, Some(&raw), Some(encoded))? {
                Ok(()) => changed = true,
                Err(_) => debug!(key = ?key, "record changed concurrently, not updated"),
            }
        }
        Ok(changed)
    }
}
