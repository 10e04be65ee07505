//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token id: {0}")]
    InvalidTokenId(String),

    #[error("invalid contract address: {0}")]
    InvalidAddress(String),

    #[error("invalid content id: {0}")]
    InvalidContentId(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
