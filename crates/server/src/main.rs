//! Easel render server binary.

use anyhow::{Context, Result};
use clap::Parser;
use easel_core::config::AppConfig;
use easel_ledger::LedgerReader;
use easel_sandbox::{ChromiumSandbox, Sandbox};
use easel_server::{AppState, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Easel - renders on-chain generative art tokens to images
#[derive(Parser, Debug)]
#[command(name = "easeld")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "EASEL_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

fn load_config(path: &str) -> Result<AppConfig> {
    let mut figment = Figment::new();

    // The file is optional; defaults and EASEL_* variables cover everything else.
    if std::path::Path::new(path).exists() {
        tracing::info!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("EASEL_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Easel v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;
    tracing::info!(
        environment = %config.server.environment,
        contract = %config.ledger.contract_address,
        "Configuration loaded"
    );

    easel_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let ledger = LedgerReader::from_config(&config.ledger)
        .context("failed to initialize ledger client")?;
    tracing::info!(
        timeout_secs = config.ledger.timeout_secs,
        "Ledger client initialized"
    );

    let sandbox: Arc<dyn Sandbox> = Arc::new(ChromiumSandbox::from_config(&config.render));
    tracing::info!(
        backend = sandbox.backend_name(),
        width = config.render.width,
        height = config.render.height,
        max_concurrent = config.render.max_concurrent,
        "Sandbox initialized"
    );

    let publisher = easel_storage::publisher_from_config(&config.storage)
        .await
        .context("failed to initialize content store")?;
    tracing::info!(
        backend = publisher.store().backend_name(),
        "Content store initialized"
    );

    publisher
        .store()
        .health_check()
        .await
        .context("content store health check failed")?;
    tracing::info!("Content store connectivity verified");

    let state = AppState::new(config.clone(), ledger, sandbox, publisher);
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
