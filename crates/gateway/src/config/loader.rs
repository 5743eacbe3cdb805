use super::StreamConfig;
use crate::error::ConfigError;

/// Load the embedded default configuration
pub fn load_default_config() -> Result<StreamConfig, ConfigError> {
    StreamConfig::from_json(include_str!("stream_config.json"))
}
