//! Prometheus metrics for the render server.
//!
//! The `/metrics` endpoint is unauthenticated. It exposes aggregate counts
//! only (no token ids or content ids), but should still be kept off public
//! networks.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static RENDER_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "easel_render_requests_total",
            "Render requests by outcome (rendered, cached, failed)",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static CACHE_HITS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("easel_cache_hits_total", "Token cache lookups that hit")
        .expect("metric creation failed")
});

pub static CACHE_MISSES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("easel_cache_misses_total", "Token cache lookups that missed")
        .expect("metric creation failed")
});

pub static SINGLE_FLIGHT_JOINS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "easel_single_flight_joins_total",
        "Requests that waited on a render already in flight for the same token",
    )
    .expect("metric creation failed")
});

pub static PIPELINE_FAILURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "easel_pipeline_failures_total",
            "Pipeline failures by kind (ledger, render, publish, resolve)",
        ),
        &["kind"],
    )
    .expect("metric creation failed")
});

pub static STAGE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "easel_stage_duration_seconds",
            "Time spent in each pipeline stage",
        )
        .buckets(vec![
            0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
        ]),
        &["stage"],
    )
    .expect("metric creation failed")
});

pub static CACHE_ENTRIES: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new("easel_cache_entries", "Tokens with a published image")
        .expect("metric creation failed")
});

pub static RENDERS_IN_FLIGHT: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "easel_renders_in_flight",
        "Distinct tokens currently being rendered",
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(RENDER_REQUESTS.clone()),
            Box::new(CACHE_HITS.clone()),
            Box::new(CACHE_MISSES.clone()),
            Box::new(SINGLE_FLIGHT_JOINS.clone()),
            Box::new(PIPELINE_FAILURES.clone()),
            Box::new(STAGE_DURATION.clone()),
            Box::new(CACHE_ENTRIES.clone()),
            Box::new(RENDERS_IN_FLIGHT.clone()),
        ];
        for collector in collectors {
            REGISTRY
                .register(collector)
                .expect("metric registration failed");
        }
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record a finished render request.
pub fn record_request(outcome: &str) {
    RENDER_REQUESTS.with_label_values(&[outcome]).inc();
}

/// Record a pipeline failure by kind.
pub fn record_failure(kind: &str) {
    PIPELINE_FAILURES.with_label_values(&[kind]).inc();
}

/// Record time spent in a pipeline stage.
pub fn observe_stage(stage: &str, seconds: f64) {
    STAGE_DURATION.with_label_values(&[stage]).observe(seconds);
}
