//! Cache configuration

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Settings shared by every market/runner cache of a feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Span of the recent-trade and recent-price windows kept per runner
    pub traded_window_secs: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            traded_window_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn traded_window(&self) -> Duration {
        Duration::seconds(i64::from(self.traded_window_secs.max(1)))
    }
}
