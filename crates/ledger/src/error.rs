//! Ledger error types.

use easel_core::TokenId;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The contract read a failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    TokenHash,
    ProjectScriptInfo,
    ProjectScriptByIndex { index: u64 },
}

impl fmt::Display for LedgerCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenHash => f.write_str("tokenIdToHash"),
            Self::ProjectScriptInfo => f.write_str("projectScriptInfo"),
            Self::ProjectScriptByIndex { index } => write!(f, "projectScriptByIndex[{index}]"),
        }
    }
}

/// Failure of a single `eth_call`.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("node returned HTTP {0}")]
    Status(u16),

    #[error("node returned RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A ledger read failed while fetching a token's program.
#[derive(Debug, Error)]
#[error("ledger read failed for token {token} at {call}: {source}")]
pub struct LedgerError {
    pub token: TokenId,
    pub call: LedgerCall,
    #[source]
    pub source: CallError,
}

impl LedgerError {
    pub fn new(token: TokenId, call: LedgerCall, source: CallError) -> Self {
        Self {
            token,
            call,
            source,
        }
    }

    /// Whether the failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.source, CallError::Timeout(_))
    }
}

/// Result type for a single contract call.
pub type CallResult<T> = std::result::Result<T, CallError>;
