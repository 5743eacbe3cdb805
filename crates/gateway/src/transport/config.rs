//! Transport configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how to open the stream connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    /// Wrap the TCP stream in TLS
    pub tls: bool,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
    pub receive_timeout_ms: u64,
    /// Capacity of the buffered line reader
    pub receive_buffer_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "stream-api.betfair.com".to_string(),
            port: 443,
            tls: true,
            connect_timeout_ms: 30_000,
            send_timeout_ms: 30_000,
            receive_timeout_ms: 30_000,
            receive_buffer_bytes: 1024 * 1024,
        }
    }
}

impl TransportConfig {
    /// `host:port` for the TCP connect
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}
