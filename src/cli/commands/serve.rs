use anyhow::Context;
use std::sync::Arc;

use crate::app::{app, AppState};
use crate::config::AppConfig;
use crate::database::{manager, MemoryStore, PgStore, SharedStore};
use crate::seeds;

pub async fn handle(mut config: AppConfig, port: Option<u16>, in_memory: bool, seed: bool) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.app.port = port;
    }

    let store: SharedStore = if in_memory {
        tracing::warn!("Using in-memory storage; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let pool = manager::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        manager::migrate(&pool).await.context("failed to apply migrations")?;
        Arc::new(PgStore::new(pool))
    };

    let state = AppState::new(config, store)?;
    if seed {
        seeds::run(state.store.as_ref(), state.hasher.clone())
            .await
            .context("seeding failed")?;
    }

    let bind_addr = format!("0.0.0.0:{}", state.config.app.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!(
        environment = ?state.config.environment,
        timezone = %state.config.app.timezone,
        "Listening on http://{}",
        bind_addr
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
