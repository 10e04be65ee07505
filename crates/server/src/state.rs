//! Application state shared across handlers.

use crate::cache::{InMemoryTokenCache, TokenCache};
use crate::orchestrator::Orchestrator;
use easel_core::ProgramAssembler;
use easel_core::config::AppConfig;
use easel_ledger::LedgerReader;
use easel_sandbox::{RenderOptions, Sandbox};
use easel_storage::Publisher;
use std::sync::Arc;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Render pipeline driver.
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Wire the pipeline from its parts, with a fresh in-memory cache.
    pub fn new(
        config: AppConfig,
        ledger: LedgerReader,
        sandbox: Arc<dyn Sandbox>,
        publisher: Publisher,
    ) -> Self {
        Self::with_cache(
            config,
            Arc::new(InMemoryTokenCache::new()),
            ledger,
            sandbox,
            publisher,
        )
    }

    /// Wire the pipeline around an existing cache.
    pub fn with_cache(
        config: AppConfig,
        cache: Arc<dyn TokenCache>,
        ledger: LedgerReader,
        sandbox: Arc<dyn Sandbox>,
        publisher: Publisher,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            cache,
            ledger,
            ProgramAssembler::from_config(&config.render),
            sandbox,
            RenderOptions::from_config(&config.render),
            publisher,
        );
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
