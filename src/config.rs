//! Configuration
//!
//! `WeaveConfig` is assembled by the `config` crate from built-in defaults,
//! the global config file, an optional explicit file and `WEAVE__*`
//! environment variables, in that order of increasing precedence.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub(crate) const DEFAULT_PERSPECTIVES_FILE: &str = "perspectives.json";
pub(crate) const DEFAULT_MODULE_LOAD_TIMEOUT_MS: u64 = 30_000;
pub(crate) const DEFAULT_DIFF_CHANNEL_CAPACITY: usize = 256;
pub(crate) const DEFAULT_NOTIFICATION_CAPACITY: usize = 1024;

fn default_perspectives_file() -> String {
    DEFAULT_PERSPECTIVES_FILE.to_string()
}

fn default_module_load_timeout_ms() -> u64 {
    DEFAULT_MODULE_LOAD_TIMEOUT_MS
}

fn default_diff_channel_capacity() -> usize {
    DEFAULT_DIFF_CHANNEL_CAPACITY
}

fn default_notification_capacity() -> usize {
    DEFAULT_NOTIFICATION_CAPACITY
}

/// Link language runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagesConfig {
    /// Upper bound on a single module load
    #[serde(default = "default_module_load_timeout_ms")]
    pub module_load_timeout_ms: u64,

    /// Buffer of the merged remote diff stream
    #[serde(default = "default_diff_channel_capacity")]
    pub diff_channel_capacity: usize,
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            module_load_timeout_ms: default_module_load_timeout_ms(),
            diff_channel_capacity: default_diff_channel_capacity(),
        }
    }
}

/// Notification bus settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Events retained for slow subscribers before they lag
    #[serde(default = "default_notification_capacity")]
    pub capacity: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            capacity: default_notification_capacity(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaveConfig {
    /// Data directory; None resolves to the platform data directory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Handle store file name, relative to the data directory
    #[serde(default = "default_perspectives_file")]
    pub perspectives_file: String,

    #[serde(default)]
    pub languages: LanguagesConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            perspectives_file: default_perspectives_file(),
            languages: LanguagesConfig::default(),
            notifications: NotificationsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl WeaveConfig {
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ApiError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => xdg::default_data_dir(),
        }
    }

    pub fn perspectives_path(&self) -> Result<PathBuf, ApiError> {
        Ok(self.resolve_data_dir()?.join(&self.perspectives_file))
    }

    pub fn module_load_timeout(&self) -> Duration {
        Duration::from_millis(self.languages.module_load_timeout_ms)
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.perspectives_file.trim().is_empty() {
            return Err(ApiError::ConfigError(
                "perspectives_file must not be empty".to_string(),
            ));
        }
        if self.languages.module_load_timeout_ms == 0 {
            return Err(ApiError::ConfigError(
                "languages.module_load_timeout_ms must be positive".to_string(),
            ));
        }
        if self.languages.diff_channel_capacity == 0 {
            return Err(ApiError::ConfigError(
                "languages.diff_channel_capacity must be positive".to_string(),
            ));
        }
        if self.notifications.capacity == 0 {
            return Err(ApiError::ConfigError(
                "notifications.capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
