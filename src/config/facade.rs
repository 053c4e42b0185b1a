//! ConfigLoader facade delegating to the merge service.

use super::merge::service::MergeService;
use super::WeaveConfig;
use config::ConfigError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, optional explicit file, then environment.
    pub fn load(explicit: Option<&Path>) -> Result<WeaveConfig, ConfigError> {
        MergeService::load(explicit)
    }

    /// Defaults, the given file, then environment. The global file is
    /// skipped.
    pub fn load_from_file(path: &Path) -> Result<WeaveConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    pub fn default() -> WeaveConfig {
        WeaveConfig::default()
    }
}
