//! Environment variable source: WEAVE__ prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub const ENV_PREFIX: &str = "WEAVE";

/// Add the environment overlay.
///
/// `WEAVE__LANGUAGES__MODULE_LOAD_TIMEOUT_MS=500` sets
/// `languages.module_load_timeout_ms`. Single-underscore variables such as
/// `WEAVE_LOG` belong to logging and are not picked up here.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    ))
}
