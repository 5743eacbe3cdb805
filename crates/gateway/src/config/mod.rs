//! Stream client configuration
//!
//! JSON-backed, every field optional with a sensible default:
//! - transport endpoint and timeouts
//! - heartbeat / conflation requested from the venue
//! - status-wait timeout and retry budget for control messages
//! - idle watchdog thresholds

pub mod loader;

pub use loader::load_default_config;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::transport::TransportConfig;

/// Heartbeat bounds the venue accepts
pub const MIN_HEARTBEAT_MS: u64 = 500;
pub const MAX_HEARTBEAT_MS: u64 = 5000;

/// Root configuration for a stream client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Application key sent with authentication
    pub app_key: String,

    pub transport: TransportConfig,

    /// Heartbeat interval requested on subscriptions
    pub heartbeat_ms: Option<u64>,

    /// Conflation interval requested on subscriptions
    pub conflate_ms: Option<u64>,

    /// Ask the venue to split large images into segments
    pub segmentation_enabled: Option<bool>,

    /// How long a control message waits for its status record
    pub status_timeout_ms: u64,

    /// Re-sends of a control message after a failure status
    pub max_retries: u32,

    pub watchdog: WatchdogConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            transport: TransportConfig::default(),
            heartbeat_ms: None,
            conflate_ms: None,
            segmentation_enabled: None,
            status_timeout_ms: 30_000,
            max_retries: 3,
            watchdog: WatchdogConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_app_key(mut self, app_key: impl Into<String>) -> Self {
        self.app_key = app_key.into();
        self
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(hb) = self.heartbeat_ms {
            if !(MIN_HEARTBEAT_MS..=MAX_HEARTBEAT_MS).contains(&hb) {
                return Err(ConfigError::Invalid(format!(
                    "heartbeat_ms {} outside {}..={}",
                    hb, MIN_HEARTBEAT_MS, MAX_HEARTBEAT_MS
                )));
            }
        }
        if self.status_timeout_ms == 0 {
            return Err(ConfigError::Invalid("status_timeout_ms must be > 0".into()));
        }
        if self.transport.host.is_empty() {
            return Err(ConfigError::Invalid("transport.host is empty".into()));
        }
        self.watchdog.validate()
    }
}

/// Idle watchdog thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Heartbeat assumed when the connection record carries none
    pub default_heartbeat_ms: u64,
    /// Stall once silence exceeds `stall_multiplier × heartbeat`
    pub stall_multiplier: f64,
    pub poll_interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            default_heartbeat_ms: 5000,
            stall_multiplier: 2.0,
            poll_interval_ms: 500,
        }
    }
}

impl WatchdogConfig {
    pub fn default_heartbeat(&self) -> Duration {
        Duration::from_millis(self.default_heartbeat_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stall_multiplier.is_finite() || self.stall_multiplier <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "stall_multiplier must be positive, got {}",
                self.stall_multiplier
            )));
        }
        if self.poll_interval_ms == 0 || self.default_heartbeat_ms == 0 {
            return Err(ConfigError::Invalid("watchdog intervals must be > 0".into()));
        }
        Ok(())
    }
}
