//! Sandbox error types.

use std::time::Duration;
use thiserror::Error;

/// A sandbox execution failed. No partial image is ever produced.
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("document load failed: {0}")]
    Load(String),

    #[error("selector {selector} did not appear within {waited:?}")]
    SelectorTimeout { selector: String, waited: Duration },

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SandboxError {
    /// Whether the failure was a timeout of any stage.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::SelectorTimeout { .. } | Self::Timeout { .. })
    }
}

/// Result type for sandbox operations.
pub type SandboxResult<T> = std::result::Result<T, SandboxError>;
