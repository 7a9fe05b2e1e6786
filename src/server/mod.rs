//! HTTP and WebSocket server
//!
//! Thin transport shell around the room: an axum router exposing the
//! WebSocket endpoint, the poll-history read API, and a liveness probe.

pub mod http;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::room::Room;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub room: Arc<Room>,
    pub config: Arc<ServerConfig>,
}

/// Bind and serve until ctrl-c.
pub async fn run(config: ServerConfig, room: Arc<Room>) -> std::io::Result<()> {
    let addr = SocketAddr::new(config.host, config.port);
    let state = AppState { room, config: Arc::new(config) };
    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "pollroom listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
