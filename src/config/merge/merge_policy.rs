//! Built-in defaults, the lowest layer of every load.

use crate::config::{
    DEFAULT_DIFF_CHANNEL_CAPACITY, DEFAULT_MODULE_LOAD_TIMEOUT_MS, DEFAULT_NOTIFICATION_CAPACITY,
    DEFAULT_PERSPECTIVES_FILE,
};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("perspectives_file", DEFAULT_PERSPECTIVES_FILE)?
        .set_default(
            "languages.module_load_timeout_ms",
            DEFAULT_MODULE_LOAD_TIMEOUT_MS,
        )?
        .set_default(
            "languages.diff_channel_capacity",
            DEFAULT_DIFF_CHANNEL_CAPACITY as u64,
        )?
        .set_default("notifications.capacity", DEFAULT_NOTIFICATION_CAPACITY as u64)?
        .set_default("logging.level", "info")
}
