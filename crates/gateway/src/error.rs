//! Error types for the gateway crate

use exstream_core::ErrorCode;
use thiserror::Error;

/// Transport-level errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Timeout waiting for response")]
    Timeout,
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Serialization(e.to_string())
    }
}

/// Outcome of a failed authentication or subscription.
///
/// Recorded on the subscription rather than returned as an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamFailure {
    #[error("Parameter empty: {0}")]
    ParameterEmpty(&'static str),

    #[error("Request {id} rejected: {code} ({message})")]
    Rejected {
        id: u32,
        code: ErrorCode,
        message: String,
    },

    #[error("Connection error")]
    ConnectionError,

    #[error("Connection closed by venue: {code:?} ({message})")]
    ConnectionClosed {
        code: Option<ErrorCode>,
        message: String,
    },
}

impl StreamFailure {
    /// Venue error code, where one was reported
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            StreamFailure::Rejected { code, .. } => Some(*code),
            StreamFailure::ConnectionClosed { code, .. } => *code,
            _ => None,
        }
    }
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
