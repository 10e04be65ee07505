//! Token image endpoint.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::orchestrator::RenderedImage;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use easel_core::{IMAGE_CONTENT_TYPE, TokenId};
use futures::StreamExt;

/// GET /render/{token_id} - PNG image of a token.
///
/// Served from the content store when the token was rendered before,
/// otherwise rendered, published and cached first.
pub async fn render_token(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> ApiResult<Response> {
    let token = TokenId::parse(&token_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let image = match state.orchestrator.handle(token).await {
        Ok(image) => image,
        Err(e) => {
            metrics::record_request("failed");
            return Err(e.into());
        }
    };

    match image {
        RenderedImage::Fresh(image) => {
            metrics::record_request("rendered");
            Ok((
                StatusCode::OK,
                [
                    (CONTENT_TYPE, IMAGE_CONTENT_TYPE.to_string()),
                    (CONTENT_LENGTH, image.len().to_string()),
                ],
                Body::from(image.into_bytes()),
            )
                .into_response())
        }
        RenderedImage::Cached(stream) => {
            metrics::record_request("cached");
            let body_stream =
                stream.map(|result| result.map_err(|e| std::io::Error::other(e.to_string())));
            Ok((
                StatusCode::OK,
                [(CONTENT_TYPE, IMAGE_CONTENT_TYPE)],
                Body::from_stream(body_stream),
            )
                .into_response())
        }
    }
}
