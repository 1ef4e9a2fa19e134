//! Error hierarchy for the value server.
//!
//! Errors are grouped by the layer that detects them. Argument and storage
//! failures raised while serving a call are converted into reply values by
//! the RPC layer and never abort the process; only start-up failures are
//! propagated out of `main`.

use std::path::PathBuf;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage engine failures (open, create, read, write)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Per-call argument validation failures
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Notification actor is unreachable
    #[error(transparent)]
    Notifier(#[from] NotifierError),

    /// Background task failures
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Embedded database errors
    #[error("Embedded database error: {0}")]
    DbError(String),

    /// Collection could not be created or opened
    #[error("creating col failed: {name}: {reason}")]
    CollectionOpen { name: String, reason: String },

    /// Stored record could not be (de)serialized
    #[error("Record codec error: {0}")]
    Codec(String),

    /// Engine handle already closed
    #[error("Storage engine is closed")]
    Closed,
}

/// Argument errors detected before any storage access.
///
/// The `Display` text is sent back to callers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("needs 2 arguments")]
    MissingArguments,

    #[error("no arguments received")]
    NoArguments,

    #[error("Assuming string as col name")]
    CollectionNameNotString,

    #[error("collection name cannot be empty")]
    EmptyCollectionName,

    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("listener config must be a mapping: {0}")]
    ListenerNotMapping(String),

    #[error("{key} invalid value: {value}")]
    InvalidListenerField { key: &'static str, value: String },

    #[error("unknown method: {0}")]
    UnknownMethod(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Notifier event channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("Notifier dropped reply for {0}")]
    ReplyDropped(&'static str),
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string()).into()
    }
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::DbError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Codec(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError(err).into()
    }
}
