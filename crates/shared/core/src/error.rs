use thiserror::Error;

/// Errors raised at the decode boundary
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
