//! Storage collaborator seam.
//!
//! [`StorageEngine`] owns the on-disk store and hands out [`Collection`]
//! handles; a [`Collection`] exposes the four record primitives the RPC
//! handlers delegate to. Implementations must tolerate concurrent
//! `open_collection` calls for the same name.

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use serde_json::Value;

use crate::Predicate;
use crate::Result;
use crate::Transform;

#[cfg_attr(test, automock)]
pub trait StorageEngine: Send + Sync + 'static {
    /// Create-or-open the collection called `name`.
    fn open_collection(
        &self,
        name: &str,
    ) -> Result<Arc<dyn Collection>>;

    /// Names of all collections already present in the store.
    fn collection_names(&self) -> Result<Vec<String>>;

    /// Flush and release the store.
    fn close(&self) -> Result<()>;
}

#[cfg_attr(test, automock)]
pub trait Collection: Send + Sync + 'static {
    /// Unconditional insert.
    fn put_value(
        &self,
        value: Value,
    ) -> Result<()>;

    /// Records matching `filter`, in insertion order.
    fn get_values(
        &self,
        filter: &Predicate,
    ) -> Result<Vec<Value>>;

    /// Remove and return the records matching `filter`.
    fn take_values(
        &self,
        filter: &Predicate,
    ) -> Result<Vec<Value>>;

    /// Rewrite matching records in place.
    ///
    /// Returns true if at least one record actually changed.
    fn update(
        &self,
        transform: &Transform,
    ) -> Result<bool>;
}
