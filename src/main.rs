use anyhow::{Context, Result};
use sora_site::config::Config;
use sora_site::server::{self, AppState};
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sora_site=info".parse()?),
        )
        .init();

    info!("Starting sora site");

    // Load configuration from environment
    let config = Config::from_env()?;
    let state = AppState::from_config(&config);

    // Warm the translation cache for namespaces every page needs
    let loaded = state.translator.preload(config.preload_namespaces.as_slice()).await;
    info!(
        "Preloaded {}/{} translation namespaces from {}",
        loaded.len(),
        config.preload_namespaces.len(),
        config.locales_dir.display()
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
