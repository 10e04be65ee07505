//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/render/{token_id}", get(handlers::render_token))
        // Unauthenticated, for load balancers and probes.
        .route("/health", get(handlers::health_check));

    // Keep off public networks when enabled; see crate::metrics.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    if state.config.server.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
