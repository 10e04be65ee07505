//! Integration tests for HTTP API endpoints.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestServer;
use easel_server::{AppState, create_router};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn invalid_token_ids_are_rejected() {
    let server = TestServer::new().await;

    for id in ["abc", "-1", "0x10", "1.5", "99999999999999999999999"] {
        let (status, json) = server.get_json(&format!("/render/{id}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "token id {id}");
        assert_eq!(json["code"], "bad_request");
    }

    assert_eq!(server.ledger.calls(), 0);
    assert_eq!(server.sandbox.renders(), 0);
}

#[tokio::test]
async fn health_reports_pipeline_state() {
    let server = TestServer::new().await;

    let (status, json) = server.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["cached_tokens"], 0);
    assert_eq!(json["renders_in_flight"], 0);

    server.get("/render/1").await;
    let (_, json) = server.get_json("/health").await;
    assert_eq!(json["cached_tokens"], 1);
}

#[tokio::test]
async fn metrics_endpoint_exposes_render_counters() {
    easel_server::metrics::register_metrics();
    let server = TestServer::new().await;
    server.get("/render/3").await;

    let (status, headers, body) = server.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("easel_render_requests_total"));
    assert!(text.contains("easel_cache_misses_total"));
}

#[tokio::test]
async fn metrics_endpoint_can_be_disabled() {
    let server = TestServer::new().await;
    let mut config = (*server.state.config).clone();
    config.server.metrics_enabled = false;
    let router = create_router(AppState {
        config: Arc::new(config),
        orchestrator: server.state.orchestrator.clone(),
    });

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cross_origin_requests_allowed() {
    let server = TestServer::new().await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://gallery.example")
        .body(Body::empty())
        .unwrap();
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let server = TestServer::new().await;
    let (status, _, _) = server.get("/render").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
