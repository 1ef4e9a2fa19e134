//! Reply values returned to RPC callers.
//!
//! ```text
//! handler failure    [false, "<message>"]
//! storage result     [true, "", <payload>] | [false, "<message>", null]
//! long-poll failure  [false, "<message>", ""]
//! ```

use std::fmt::Display;

use serde_json::json;
use serde_json::Value;

/// Two-element failure for argument and collection errors.
pub fn failure(message: impl Display) -> Value {
    json!([false, message.to_string()])
}

/// The collection could not be resolved.
pub fn collection_failure(err: impl Display) -> Value {
    failure(format!("Error in collection: {}", err))
}

pub fn success(payload: Value) -> Value {
    json!([true, "", payload])
}

/// A storage primitive failed after the collection was resolved.
pub fn storage_failure(err: impl Display) -> Value {
    json!([false, err.to_string(), Value::Null])
}

pub fn listener_failure(message: impl Display) -> Value {
    json!([false, message.to_string(), ""])
}
