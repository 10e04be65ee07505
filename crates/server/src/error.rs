//! Pipeline and API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use easel_core::{ContentId, TokenId};
use easel_ledger::LedgerError;
use easel_sandbox::SandboxError;
use easel_storage::StorageError;
use serde::Serialize;
use std::sync::Arc;

/// A render request failed. Terminal for the request; never retried.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    LedgerRead(#[from] LedgerError),

    #[error("render failed for token {token}: {source}")]
    Render {
        token: TokenId,
        #[source]
        source: SandboxError,
    },

    #[error("publish failed for token {token}: {source}")]
    Publish {
        token: TokenId,
        #[source]
        source: StorageError,
    },

    #[error("resolve failed for token {token} ({cid}): {source}")]
    Resolve {
        token: TokenId,
        cid: ContentId,
        #[source]
        source: StorageError,
    },

    #[error("render task for token {token} aborted: {reason}")]
    Aborted { token: TokenId, reason: String },
}

impl RenderError {
    /// Failure kind, used as a metric label and error code suffix.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LedgerRead(_) => "ledger",
            Self::Render { .. } => "render",
            Self::Publish { .. } => "publish",
            Self::Resolve { .. } => "resolve",
            Self::Aborted { .. } => "aborted",
        }
    }

    /// Token the failed request was for.
    pub fn token(&self) -> TokenId {
        match self {
            Self::LedgerRead(e) => e.token,
            Self::Render { token, .. }
            | Self::Publish { token, .. }
            | Self::Resolve { token, .. }
            | Self::Aborted { token, .. } => *token,
        }
    }

    /// Whether the underlying cause was a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::LedgerRead(e) => e.is_timeout(),
            Self::Render { source, .. } => source.is_timeout(),
            Self::Publish { source, .. } | Self::Resolve { source, .. } => source.is_timeout(),
            Self::Aborted { .. } => false,
        }
    }
}

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Render(#[from] Arc<RenderError>),
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        Self::Render(Arc::new(err))
    }
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Render(e) => match e.as_ref() {
                RenderError::LedgerRead(_) => "ledger_read_failed",
                RenderError::Render { .. } => "render_failed",
                RenderError::Publish { .. } => "publish_failed",
                RenderError::Resolve { .. } => "resolve_failed",
                RenderError::Aborted { .. } => "internal_error",
            },
        }
    }

    /// Get the HTTP status code for this error.
    ///
    /// Failures of the ledger node or the content store are upstream
    /// failures (502); sandbox failures are our own (500).
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Render(e) => match e.as_ref() {
                RenderError::LedgerRead(_)
                | RenderError::Publish { .. }
                | RenderError::Resolve { .. } => StatusCode::BAD_GATEWAY,
                RenderError::Render { .. } | RenderError::Aborted { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
