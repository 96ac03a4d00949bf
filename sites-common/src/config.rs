//! Bootstrap configuration loading and root folder resolution
//!
//! Only bootstrap concerns live here (where the database is, which port to
//! bind, how loud to log). Nothing about naming or sequence state is
//! configured or cached.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "SITES_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_FILE_ENV: &str = "SITES_CONFIG";

/// Application directory name under OS config/data dirs
const APP_DIR: &str = "sites-registry";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Folder holding the registry database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Database file name inside the root folder
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_file: default_database_file(),
            bind_address: default_bind_address(),
            port: default_port(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_database_file() -> String {
    "sites_registry.db".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load from `path`.
    ///
    /// A missing file yields defaults with a warning; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// Config file resolution:
/// 1. Command-line argument
/// 2. `SITES_CONFIG` environment variable
/// 3. `<config_dir>/sites-registry/sites-registry.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("sites-registry.toml"))
        .unwrap_or_else(|| PathBuf::from("sites-registry.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `SITES_ROOT_FOLDER` environment variable
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent default data folder
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root) = &config.root_folder {
        return root.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./sites_data"))
}

/// Database path inside a resolved root folder
pub fn database_path(root_folder: &Path, config: &TomlConfig) -> PathBuf {
    root_folder.join(&config.database_file)
}
