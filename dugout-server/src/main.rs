//! dugout-server - record service entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dugout_common::config::{load_toml_config, resolve_api_key};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dugout_server::config::{CliArgs, Config};
use dugout_server::db::init_database_pool;
use dugout_server::services::{ChatCompletionClient, HttpRecordSource};
use dugout_server::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let toml_config = load_toml_config(args.config.as_deref())
        .context("Failed to load configuration file")?;
    let api_key = resolve_api_key(&toml_config);
    let config = Config::resolve(&args, &toml_config, api_key);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup step
    info!(
        "Starting dugout-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if config.backend.api_key.is_none() {
        warn!("No API key configured; summary generation requests will fail");
        warn!("Set DUGOUT_OPENAI_API_KEY or OPENAI_API_KEY, or openai_api_key in the config file");
    }

    let pool = match init_database_pool(&config.database_url).await {
        Ok(pool) => {
            info!("Record store ready: {}", config.database_url);
            pool
        }
        Err(e) => {
            error!("Failed to open record store: {}", e);
            return Err(e).context("Failed to initialize database");
        }
    };

    let generator = ChatCompletionClient::new(config.backend.clone())
        .context("Failed to create generation backend client")?;
    info!(model = %generator.model(), base_url = %config.backend.base_url, "Generation backend configured");

    let source = HttpRecordSource::new(&config.upstream)
        .context("Failed to create upstream client")?;

    let state = AppState::new(
        pool,
        Arc::new(source),
        Arc::new(generator),
        config.relay.clone(),
        config.rank_seed,
    );
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
