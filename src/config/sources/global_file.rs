//! Global config file: `$XDG_CONFIG_HOME/weave/config.toml`, optional.

use crate::config::xdg;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use tracing::debug;

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Ok(path) = xdg::global_config_path() else {
        debug!("No config home available, skipping global config file");
        return Ok(builder);
    };
    Ok(builder.add_source(File::from(path).required(false)))
}
