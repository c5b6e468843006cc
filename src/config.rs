//! Configuration for the checkout hub.

use crate::types::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Address the HTTP service binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Log level, used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Origin permission storage.
    #[serde(default)]
    pub permissions: PermissionStoreConfig,
}

/// Configuration of the origin permission store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStoreConfig {
    /// Location of the SQLite database.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Origins granted access to all addresses when the database is first created.
    #[serde(default = "default_seed_origins")]
    pub seed_origins: Vec<String>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            log_level: default_log_level(),
            permissions: PermissionStoreConfig::default(),
        }
    }
}

impl Default for PermissionStoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            seed_origins: default_seed_origins(),
        }
    }
}

impl PermissionStoreConfig {
    pub fn new<P: AsRef<Path>>(database_path: P) -> Self {
        Self {
            database_path: database_path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_origins = origins.into_iter().map(Into::into).collect();
        self
    }
}

impl HubConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data").join("permissions.sqlite")
}

/// Origins operated by the wallet itself.
fn default_seed_origins() -> Vec<String> {
    [
        "https://safe.nimiq.com",
        "https://wallet.nimiq.com",
        "https://nimiq.com",
        "https://www.nimiq.com",
        "https://shop.nimiq.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
