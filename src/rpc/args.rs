use std::time::Duration;

use serde_json::Value;

use crate::constants::LISTENER_KEY_COLLECTION;
use crate::constants::LISTENER_KEY_IS_INIT;
use crate::constants::LISTENER_KEY_VERSION;
use crate::constants::LISTENER_KEY_WAIT_TIME;
use crate::LongPollRequest;
use crate::RpcError;
use crate::VersionToken;

/// Split positional arguments into the collection name and its payload.
///
/// Extra arguments are ignored.
pub fn collection_args(args: &[Value]) -> std::result::Result<(&str, &Value), RpcError> {
    let [name, payload, ..] = args else {
        return Err(RpcError::MissingArguments);
    };
    let name = name.as_str().ok_or(RpcError::CollectionNameNotString)?;
    if name.is_empty() {
        return Err(RpcError::EmptyCollectionName);
    }
    Ok((name, payload))
}

/// Decoded `valu-long-waiter` configuration mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListenerInfo {
    pub is_init: bool,
    pub version: String,
    pub collection: String,
    pub wait_time_sec: i64,
}

impl ListenerInfo {
    /// Unknown keys are ignored, missing keys keep their defaults.
    pub fn parse(config: &Value) -> std::result::Result<Self, RpcError> {
        let map = config
            .as_object()
            .ok_or_else(|| RpcError::ListenerNotMapping(config.to_string()))?;

        let mut listener = Self::default();
        for (key, value) in map {
            match key.as_str() {
                LISTENER_KEY_IS_INIT => {
                    listener.is_init = value
                        .as_bool()
                        .ok_or_else(|| invalid_field(LISTENER_KEY_IS_INIT, value))?;
                }
                LISTENER_KEY_VERSION => {
                    listener.version = value
                        .as_str()
                        .ok_or_else(|| invalid_field(LISTENER_KEY_VERSION, value))?
                        .to_string();
                }
                LISTENER_KEY_COLLECTION => {
                    listener.collection = value
                        .as_str()
                        .ok_or_else(|| invalid_field(LISTENER_KEY_COLLECTION, value))?
                        .to_string();
                }
                LISTENER_KEY_WAIT_TIME => {
                    listener.wait_time_sec = value
                        .as_i64()
                        .ok_or_else(|| invalid_field(LISTENER_KEY_WAIT_TIME, value))?;
                }
                _ => {}
            }
        }
        Ok(listener)
    }

    /// The version is only read on follow-up calls; an empty one means the
    /// caller has nothing to compare against. It is kept as sent, so a
    /// timed-out call hands it back unchanged.
    pub fn into_request(self) -> std::result::Result<LongPollRequest, RpcError> {
        if self.collection.is_empty() {
            return Err(RpcError::EmptyCollectionName);
        }

        let known_version = if self.is_init || self.version.is_empty() {
            None
        } else {
            Some(VersionToken::new(self.version))
        };

        Ok(LongPollRequest {
            collection: self.collection,
            is_first_call: self.is_init,
            known_version,
            timeout: Duration::from_secs(self.wait_time_sec.max(0) as u64),
        })
    }
}

/// Versions travel as strings; none renders as `""`.
pub fn render_version(version: Option<&VersionToken>) -> String {
    version.map(VersionToken::to_string).unwrap_or_default()
}

fn invalid_field(
    key: &'static str,
    value: &Value,
) -> RpcError {
    RpcError::InvalidListenerField {
        key,
        value: value.to_string(),
    }
}
