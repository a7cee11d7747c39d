use crate::error::{RelengError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory and the user config directory
pub const CONFIG_FILE_NAME: &str = "releng.toml";

/// Represents the complete configuration for releng.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub promotion: PromotionConfig,

    #[serde(default)]
    pub packaging: PackagingConfig,
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Settings for computing and checking promotion chains.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PromotionConfig {
    /// Remote whose branches are scanned and that qualifies chain entries
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Default for `--skip-master`
    #[serde(default)]
    pub skip_master: bool,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        PromotionConfig {
            remote: default_remote(),
            skip_master: false,
        }
    }
}

/// Settings for writing versions into packaging metadata.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct PackagingConfig {
    /// Write the release with the `%{?dist}` macro appended
    #[serde(default)]
    pub append_dist: bool,
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `releng.toml` in current directory
/// 3. `releng.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                local
            } else {
                match user_config_path() {
                    Some(user) if user.exists() => user,
                    _ => {
                        debug!("no config file found, using defaults");
                        return Ok(Config::default());
                    }
                }
            }
        }
    };

    let content = fs::read_to_string(&path).map_err(|e| {
        RelengError::config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| RelengError::config(format!("Cannot parse {}: {}", path.display(), e)))?;

    debug!(path = %path.display(), "loaded config");
    Ok(config)
}
