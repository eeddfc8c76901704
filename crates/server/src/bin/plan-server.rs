//! Scopeline API server.

use std::sync::Arc;

use anyhow::{Context, Result};
use plan::ai::ProviderCredentials;
use plan::store::snapshot;
use server::{build_router, AppState, Config};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();
    let creds = ProviderCredentials::from_env();
    if !creds.is_configured() {
        tracing::warn!("No AI provider credentials found; chat and estimation endpoints will return 503");
    }

    let store = snapshot::load(&config.snapshot_path)
        .await
        .with_context(|| {
            format!(
                "failed to load snapshot from {}",
                config.snapshot_path.display()
            )
        })?;
    info!(
        tasks = store.task_count(),
        path = %config.snapshot_path.display(),
        "Store loaded"
    );

    let state = AppState::new(
        Arc::new(store),
        creds,
        Some(config.snapshot_path.clone()),
    );
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Scopeline API server listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
