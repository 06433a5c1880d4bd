//! edgepix server entry point.
//!
//! Boots the tiered image proxy over HTTP. Logs are JSON on stderr.
//! On shutdown the listener stops accepting, then pending cache fills
//! are allowed to finish.

use std::sync::Arc;

use anyhow::Result;
use edgepix_core::{AppConfig, MemoryEdgeCache, ObjectStore};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod proxy;

use proxy::Engine;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        addr = %config.listen_addr,
        db_path = %config.db_path.display(),
        routes = config.routes.len(),
        "starting edgepix"
    );

    let store = ObjectStore::open(&config.db_path).await?;
    let edge = MemoryEdgeCache::new(config.edge_ttl(), config.edge_max_entries);
    let engine = Arc::new(Engine::new(&config, Arc::new(store), Arc::new(edge))?);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, handler::router(Arc::clone(&engine)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(pending = engine.backfill().pending(), "listener stopped, draining cache fills");
    engine.backfill().drain().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
        std::future::pending::<()>().await;
    }
}
