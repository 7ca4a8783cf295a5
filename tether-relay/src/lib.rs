mod config;
mod hub;
mod signaling;

pub use config::*;
pub use hub::*;
pub use signaling::*;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Routes of the relay: `/ws/join/{room_id}/c/{user_id}`.
pub fn router(hub: RelayHub) -> Router {
    Router::new()
        .route("/ws/join/{room_id}/c/{user_id}", get(ws_handler))
        .with_state(hub)
}

/// Binds and serves until the process ends.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Relay listening on ws://{}/ws", config.bind_addr);

    axum::serve(listener, router(RelayHub::new()))
        .await
        .context("Relay server stopped")
}

/// Serves on a background task; returns the bound address (handy with port 0).
pub async fn spawn(config: RelayConfig) -> Result<(SocketAddr, RelayHub, JoinHandle<()>)> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;
    let hub = RelayHub::new();
    let app = router(hub.clone());

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Relay server failed: {}", e);
        }
    });
    info!("Relay listening on ws://{}/ws", addr);

    Ok((addr, hub, handle))
}
