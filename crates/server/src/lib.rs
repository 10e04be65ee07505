//! HTTP render server for easel.
//!
//! This crate provides:
//! - The token cache
//! - The request orchestrator (cache lookup, fetch, render, publish)
//! - HTTP endpoints for rendering, health and metrics

pub mod cache;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod orchestrator;
pub mod routes;
pub mod state;

pub use cache::{InMemoryTokenCache, TokenCache};
pub use error::{ApiError, RenderError};
pub use orchestrator::{Orchestrator, RenderStage, RenderedImage};
pub use routes::create_router;
pub use state::AppState;
