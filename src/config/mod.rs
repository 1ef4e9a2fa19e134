//! Configuration management for the value server.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`VALU__SECTION__KEY`)
//! - Legacy flat overrides `VALUPORT`, `VALUFILEPATH`, `VALUDBNAME` (highest priority)
mod monitoring;
mod notifier;
mod server;
pub use monitoring::*;
pub use notifier::*;
pub use server::*;


use std::env;
use std::path::PathBuf;

use config::Config;
use config::ConfigBuilder;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Legacy environment variables and the keys they override.
const LEGACY_ENV_OVERRIDES: [(&str, &str); 3] = [
    ("VALUPORT", "server.port"),
    ("VALUFILEPATH", "server.filepath"),
    ("VALUDBNAME", "server.dbname"),
];

/// Main configuration container
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables with `VALU__` prefix
/// 4. Legacy `VALUPORT` / `VALUFILEPATH` / `VALUDBNAME` variables
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ValuConfig {
    /// RPC listener and database location
    #[serde(default)]
    pub server: ServerConfig,
    /// Notification actor and long-poll tuning
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Metrics exporter settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Directory receiving the server log file
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl ValuConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers MUST call `validate()` before using the configuration.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        let config: Self = Self::with_env_sources(builder)?.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Environment variables are re-applied on top of the file.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let builder = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path));

        let config: Self = Self::with_env_sources(builder)?.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.server.validate()?;
        self.notifier.validate()?;
        self.monitoring.validate(self.server.port)?;
        Ok(self)
    }

    fn with_env_sources(
        builder: ConfigBuilder<config::builder::DefaultState>
    ) -> Result<ConfigBuilder<config::builder::DefaultState>> {
        let mut builder = builder.add_source(
            Environment::with_prefix("VALU")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        for (var, key) in LEGACY_ENV_OVERRIDES {
            builder = builder.set_override_option(key, env::var(var).ok())?;
        }

        Ok(builder)
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}
