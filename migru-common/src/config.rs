//! Configuration loading and data directory resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional settings from the Migru TOML config file
/// (`~/.config/migru/config.toml` on Linux/macOS)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Data directory holding migru.db
    pub data_dir: Option<String>,
    /// HTTP listen port override
    pub port: Option<u16>,
    /// Development mode (unauthenticated requests map to a demo user)
    pub dev_mode: Option<bool>,
    /// Hume API key for EVI token brokering
    pub hume_api_key: Option<String>,
    /// Hume secret key for EVI token brokering
    pub hume_secret_key: Option<String>,
}

/// Data directory resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config) = load_toml_config() {
        if let Some(data_dir) = config.data_dir {
            return PathBuf::from(data_dir);
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir()
}

/// Load the TOML config file from the platform config directory
pub fn load_toml_config() -> Result<TomlConfig> {
    let path = config_file_path()?;
    read_toml_config(&path)
}

/// Read and parse a specific TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse config failed: {}", e)))
}

/// Get the config file path for the platform
fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("migru").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/migru/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default data directory path
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("migru"))
        .unwrap_or_else(|| PathBuf::from("./migru_data"))
}

/// Ensure the data directory exists, creating it if missing
pub fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)?;
        tracing::info!("Created data directory: {}", data_dir.display());
    }
    Ok(())
}

/// Database file path inside the data directory
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("migru.db")
}
