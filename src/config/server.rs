use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// RPC listener and on-disk store location.
///
/// `port`, `filepath` and `dbname` can each be overridden by the legacy
/// environment variables `VALUPORT`, `VALUFILEPATH` and `VALUDBNAME`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the database. Empty means the working directory.
    #[serde(default)]
    pub filepath: String,

    #[serde(default = "default_dbname")]
    pub dbname: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            port: default_port(),
            filepath: String::new(),
            dbname: default_dbname(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::Config(ConfigError::Message(
                "server.port cannot be 0".into(),
            )));
        }

        if self.dbname.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "server.dbname cannot be empty".into(),
            )));
        }

        self.socket_addr()?;
        Ok(())
    }

    /// Location of the sled database directory.
    pub fn db_path(&self) -> PathBuf {
        Path::new(&self.filepath).join(&self.dbname)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.listen_address, self.port)
            .parse()
            .map_err(|e| {
                Error::Config(ConfigError::Message(format!(
                    "invalid listen address {}:{}: {}",
                    self.listen_address, self.port, e
                )))
            })
    }
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9901
}

fn default_dbname() -> String {
    "valudb".to_string()
}
