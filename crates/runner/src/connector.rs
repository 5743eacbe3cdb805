//! Channel factories used when the feed reconnects

use async_trait::async_trait;
use exstream_gateway::transport::tls;
use exstream_gateway::{Channel, TransportConfig, TransportError};

/// Opens a fresh connection to the venue
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Channel, TransportError>;
}

/// Connects over TCP/TLS as configured
#[derive(Debug, Clone)]
pub struct VenueConnector {
    config: TransportConfig,
}

impl VenueConnector {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for VenueConnector {
    async fn connect(&self) -> Result<Channel, TransportError> {
        tls::connect(&self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ensure trait is object-safe
    fn _assert_connector_object_safe(_: &dyn Connector) {}

    #[tokio::test]
    async fn test_refused_connection_is_an_error() {
        // port 9 on loopback: nothing listens there in test environments
        let connector = VenueConnector::new(TransportConfig {
            host: "127.0.0.1".into(),
            port: 9,
            tls: false,
            connect_timeout_ms: 1_000,
            ..TransportConfig::default()
        });

        assert!(connector.connect().await.is_err());
    }
}
