use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Tuning for the notification actor and long-poll waits.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotifierConfig {
    /// Capacity of the inbound update stream. Mutation handlers only wait
    /// on notification delivery once this many events are outstanding.
    #[serde(default = "default_update_queue_size")]
    pub update_queue_size: usize,

    /// Capacity of the inbound subscribe stream.
    #[serde(default = "default_subscribe_queue_size")]
    pub subscribe_queue_size: usize,

    /// Upper bound applied to a caller supplied `wait-time-sec`.
    #[serde(default = "default_max_wait_time_sec")]
    pub max_wait_time_sec: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            update_queue_size: default_update_queue_size(),
            subscribe_queue_size: default_subscribe_queue_size(),
            max_wait_time_sec: default_max_wait_time_sec(),
        }
    }
}

impl NotifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.update_queue_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "notifier.update_queue_size must be greater than 0".into(),
            )));
        }

        if self.subscribe_queue_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "notifier.subscribe_queue_size must be greater than 0".into(),
            )));
        }

        if self.max_wait_time_sec == 0 {
            return Err(Error::Config(ConfigError::Message(
                "notifier.max_wait_time_sec must be greater than 0".into(),
            )));
        }

        Ok(())
    }
}

fn default_update_queue_size() -> usize {
    1000
}

fn default_subscribe_queue_size() -> usize {
    256
}

fn default_max_wait_time_sec() -> u64 {
    3600
}
