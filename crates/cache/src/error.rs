//! Error types for the cache crate

use thiserror::Error;

/// Cache-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Required argument missing: {0}")]
    MissingArgument(&'static str),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;
