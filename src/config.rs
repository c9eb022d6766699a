//! Panel configuration for the browser node.
//!
//! Configuration lives in a JSON file under the per-user config directory
//! (`<config_dir>/prizm-client/config.json`), shared with the desktop shell
//! that embeds this crate. Unknown fields (tray settings and other shell
//! concerns) are tolerated on load and simply not rewritten here.
//!
//! ```json
//! {
//!   "server": { "host": "127.0.0.1", "port": 4127 },
//!   "client": { "name": "Prizm Browser Node", "auto_register": true,
//!               "requested_scopes": ["default"] },
//!   "api_key": ""
//! }
//! ```
//!
//! The controller reads the connection quartet through the [`ConfigStore`]
//! seam, so tests and embedders can supply configuration without touching
//! the filesystem. [`FileConfigStore`] is the shipped implementation.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Directory under the user config dir holding the shared config file.
pub const CONFIG_DIR_NAME: &str = "prizm-client";

/// File name of the shared config file.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Default panel server host.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default panel server port.
pub const DEFAULT_SERVER_PORT: u16 = 4127;

/// Default client display name sent to the panel.
pub const DEFAULT_CLIENT_NAME: &str = "Prizm Browser Node";

// ============================================================================
// Server Settings
// ============================================================================

/// Panel server address settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Panel host name or IP address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Panel port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

fn default_host() -> String {
    DEFAULT_SERVER_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

// ============================================================================
// Client Settings
// ============================================================================

/// Identity settings for this client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Display name; doubles as the relay `clientId` until registration
    /// replaces it with the panel-issued id.
    #[serde(default = "default_client_name")]
    pub name: String,
    /// Whether [`ensure_registered`](crate::registration::ensure_registered)
    /// may register automatically when no api key is present.
    #[serde(default = "default_true")]
    pub auto_register: bool,
    /// Scopes requested at registration time.
    #[serde(default = "default_scopes")]
    pub requested_scopes: Vec<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_CLIENT_NAME.to_string(),
            auto_register: true,
            requested_scopes: default_scopes(),
        }
    }
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

fn default_true() -> bool {
    true
}

fn default_scopes() -> Vec<String> {
    vec!["default".to_string()]
}

// ============================================================================
// App Config
// ============================================================================

/// Full on-disk configuration.
///
/// Every field carries a serde default, so a missing or partial file always
/// loads into a usable config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Panel server address.
    #[serde(default)]
    pub server: ServerSettings,
    /// Client identity.
    #[serde(default)]
    pub client: ClientSettings,
    /// Panel-issued api key; empty until registered.
    #[serde(default)]
    pub api_key: String,
}

impl AppConfig {
    /// Returns the default config file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the user config directory cannot be
    /// determined.
    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| Error::config("could not determine the user config directory"))?;
        Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads the config from the default path.
    ///
    /// A missing file yields [`AppConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the path cannot be determined and
    /// [`Error::Io`] / [`Error::Json`] if an existing file cannot be read
    /// or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads the config from `path`, defaulting when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Saves the config to the default path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file or its parent directories cannot
    /// be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Saves the config to `path`, creating parent directories on demand.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the panel base URL (`http://host:port`).
    #[must_use]
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server.host, self.server.port)
    }

    /// Extracts the validated connection quartet the relay tunnel needs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the host or client name is empty, or
    /// when no api key has been issued yet (register first).
    pub fn node_config(&self) -> Result<NodeConfig> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config("server host is empty"));
        }
        if self.client.name.trim().is_empty() {
            return Err(Error::config("client name is empty"));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::config(
                "no api key configured; register this client with the panel first",
            ));
        }
        Ok(NodeConfig {
            server_host: self.server.host.clone(),
            server_port: self.server.port,
            client_name: self.client.name.clone(),
            api_key: self.api_key.clone(),
        })
    }
}

// ============================================================================
// Node Config
// ============================================================================

/// The connection quartet consumed by the relay tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Panel host name or IP address.
    pub server_host: String,
    /// Panel port.
    pub server_port: u16,
    /// Client identity sent as the relay `clientId`.
    pub client_name: String,
    /// Panel-issued api key.
    pub api_key: String,
}

// ============================================================================
// Config Store
// ============================================================================

/// Source of the node's connection configuration.
///
/// The controller reads configuration at tunnel-connect time through this
/// trait, so embedders can back it with files, in-memory state, or their
/// own settings store.
pub trait ConfigStore: Send + Sync {
    /// Returns the validated connection quartet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the stored configuration is missing
    /// required values.
    fn node_config(&self) -> Result<NodeConfig>;
}

/// [`ConfigStore`] backed by the shared on-disk config file.
///
/// Reads the file on every call, so edits made by the desktop shell (for
/// example after a registration) take effect on the next `start`.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Creates a store over the default config path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the user config directory cannot be
    /// determined.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: AppConfig::config_path()?,
        })
    }

    /// Creates a store over an explicit path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path this store reads from.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn node_config(&self) -> Result<NodeConfig> {
        AppConfig::load_from(&self.path)?.node_config()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 4127);
        assert_eq!(config.client.name, "Prizm Browser Node");
        assert!(config.client.auto_register);
        assert_eq!(config.client.requested_scopes, vec!["default"]);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.server.port, 4127);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = AppConfig::default();
        config.server.host = "panel.example.com".to_string();
        config.server.port = 9000;
        config.api_key = "key-123".to_string();
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.server.host, "panel.example.com");
        assert_eq!(loaded.server.port, 9000);
        assert_eq!(loaded.api_key, "key-123");
    }

    #[test]
    fn test_partial_file_fills_defaults_and_ignores_unknown_fields() {
        let raw = r#"{
            "server": { "host": "10.0.0.5" },
            "api_key": "abc",
            "tray": { "enabled": true }
        }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.server.host, "10.0.0.5");
        assert_eq!(config.server.port, 4127);
        assert_eq!(config.client.name, "Prizm Browser Node");
        assert_eq!(config.api_key, "abc");
    }

    #[test]
    fn test_server_url() {
        let mut config = AppConfig::default();
        config.server.host = "panel.local".to_string();
        config.server.port = 8080;
        assert_eq!(config.server_url(), "http://panel.local:8080");
    }

    #[test]
    fn test_node_config_requires_api_key() {
        let config = AppConfig::default();
        let err = config.node_config().unwrap_err();
        assert!(err.to_string().contains("api key"));
    }

    #[test]
    fn test_node_config_rejects_blank_host() {
        let mut config = AppConfig::default();
        config.server.host = "  ".to_string();
        config.api_key = "key".to_string();
        assert!(config.node_config().is_err());
    }

    #[test]
    fn test_node_config_extracts_quartet() {
        let mut config = AppConfig::default();
        config.api_key = "key-9".to_string();
        config.client.name = "desk-01".to_string();

        let node = config.node_config().unwrap();
        assert_eq!(node.server_host, "127.0.0.1");
        assert_eq!(node.server_port, 4127);
        assert_eq!(node.client_name, "desk-01");
        assert_eq!(node.api_key, "key-9");
    }

    #[test]
    fn test_file_store_reads_saved_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.api_key = "stored-key".to_string();
        config.save_to(&path).unwrap();

        let store = FileConfigStore::at(&path);
        let node = store.node_config().unwrap();
        assert_eq!(node.api_key, "stored-key");
    }

    #[test]
    fn test_file_store_missing_file_fails_validation() {
        let dir = TempDir::new().unwrap();
        let store = FileConfigStore::at(dir.path().join("config.json"));
        assert!(store.node_config().is_err());
    }
}
