//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the VitalTrack data directory
pub const ROOT_ENV_VAR: &str = "VITALTRACK_ROOT";

/// TOML configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Data directory override
    pub root_folder: Option<String>,
    /// tracing filter directive, e.g. "info" or "vt_sync=debug"
    pub log_level: Option<String>,
    /// Seconds between intake drain cycles
    pub sync_interval_secs: Option<u64>,
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. VITALTRACK_ROOT environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config) = load_toml_config() {
        if let Some(root_folder) = config.root_folder {
            return PathBuf::from(root_folder);
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Load the TOML config file from the platform config directory
pub fn load_toml_config() -> Result<TomlConfig> {
    let path = config_file_path()
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    if !path.exists() {
        return Err(Error::Config(format!("Config file not found: {:?}", path)));
    }
    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Platform config file location (`~/.config/vitaltrack/config.toml` on Linux)
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vitaltrack").join("config.toml"))
}

/// OS-dependent default data directory
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vitaltrack"))
        .unwrap_or_else(|| PathBuf::from("./vitaltrack_data"))
}

/// Database file location inside the data directory
pub fn database_path(root: &Path) -> PathBuf {
    root.join("vitaltrack.db")
}
