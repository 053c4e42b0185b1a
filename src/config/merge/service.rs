//! MergeService: orchestrates sources and deserializes to WeaveConfig.

use crate::config::sources::{environment, explicit_file, global_file};
use crate::config::WeaveConfig;
use config::ConfigError;
use std::path::Path;

use super::merge_policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: defaults (lowest) -> global file -> explicit file ->
    /// environment (highest).
    pub fn load(explicit: Option<&Path>) -> Result<WeaveConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = match explicit {
            Some(path) => explicit_file::add_to_builder(builder, path)?,
            None => builder,
        };
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }

    /// Load from one file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<WeaveConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = explicit_file::add_to_builder(builder, path)?;
        let builder = environment::add_to_builder(builder)?;

        builder.build()?.try_deserialize()
    }
}
