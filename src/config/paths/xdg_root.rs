//! XDG Base Directory locations for weave data and config.

use crate::error::ApiError;
use std::path::PathBuf;

const APP_DIR: &str = "weave";

/// `$XDG_DATA_HOME`, falling back to `$HOME/.local/share`.
pub fn data_home() -> Option<PathBuf> {
    if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        if !xdg_data_home.is_empty() {
            return Some(PathBuf::from(xdg_data_home));
        }
    }

    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".local").join("share"))
}

/// `$XDG_CONFIG_HOME`, falling back to `$HOME/.config`.
pub fn config_home() -> Result<PathBuf, ApiError> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg_config_home.is_empty() {
            return Ok(PathBuf::from(xdg_config_home));
        }
    }

    let home = std::env::var("HOME").map_err(|_| {
        ApiError::ConfigError(
            "Could not determine XDG config home directory (HOME not set)".to_string(),
        )
    })?;

    Ok(PathBuf::from(home).join(".config"))
}

/// `$XDG_CONFIG_HOME/weave/config.toml`
pub fn global_config_path() -> Result<PathBuf, ApiError> {
    Ok(config_home()?.join(APP_DIR).join("config.toml"))
}

/// Data directory used when the config leaves `data_dir` unset.
///
/// `$XDG_DATA_HOME/weave` when resolvable, otherwise the platform data
/// directory from `ProjectDirs`.
pub fn default_data_dir() -> Result<PathBuf, ApiError> {
    if let Some(home) = data_home() {
        return Ok(home.join(APP_DIR));
    }
    directories::ProjectDirs::from("", APP_DIR, APP_DIR)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            ApiError::ConfigError("Could not determine a data directory for weave".to_string())
        })
}
