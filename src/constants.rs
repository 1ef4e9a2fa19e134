//! Wire names and fixed values shared across modules.

// -
// RPC method names

pub const METHOD_PUT_VALUE: &str = "put-value";
pub const METHOD_GET_VALUES: &str = "get-values";
pub const METHOD_TAKE_VALUES: &str = "take-values";
pub const METHOD_UPDATE: &str = "update";
pub const METHOD_LONG_WAITER: &str = "valu-long-waiter";

// -
// Long-poll request and reply keys

pub(crate) const LISTENER_KEY_IS_INIT: &str = "is-init";
pub(crate) const LISTENER_KEY_VERSION: &str = "version";
pub(crate) const LISTENER_KEY_COLLECTION: &str = "col";
pub(crate) const LISTENER_KEY_WAIT_TIME: &str = "wait-time-sec";

pub(crate) const REPLY_KEY_VERSION: &str = "version";
pub(crate) const REPLY_KEY_TIMED_OUT: &str = "was-timedout";

// -
// Versioning

/// Version reported for a collection with no observed mutation.
pub const UNSET_VERSION: u64 = 0;

/// Seed for a collection's first mutation; the first observed version is `INITIAL_VERSION + 1`.
pub const INITIAL_VERSION: u64 = 0;

// -
// Metrics

/// Collections that get their own `collection_version` series; later ones are not exported.
pub(crate) const MAX_GAUGED_COLLECTIONS: usize = 1024;

// -
// Storage

/// Sled's own default tree, never exposed as a collection.
pub(crate) const SLED_DEFAULT_TREE: &[u8] = b"__sled__default";
pub(crate) const SLED_RESERVED_PREFIX: &str = "__sled__";
