//! WebSocket transport
//!
//! Accepts a socket, assigns it a connection id, and attaches it to the
//! room (which replays any active poll). The reader half parses and
//! dispatches commands; the writer half drains the connection's outbound
//! queue and interleaves keepalive pings. The room dropping the outbound
//! sender (a kick) ends both halves.

pub mod handlers;

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::AppState;
use crate::protocol::ServerEvent;
use crate::registry::ConnectionId;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = generate_connection_id();
    info!(connection = %conn_id, "client connected");

    let rx = state.room.connect(&conn_id);
    let (sink, stream) = socket.split();

    let heartbeat = Duration::from_secs(state.config.heartbeat_interval_secs.max(1));
    let mut writer = tokio::spawn(write_loop(sink, rx, heartbeat));

    read_loop(stream, &state, &conn_id, &mut writer).await;

    state.room.disconnect(&conn_id);
    writer.abort();
    info!(connection = %conn_id, "client disconnected");
}

/// Parse and dispatch inbound commands until the peer goes away or the
/// writer finishes (outbound queue closed, e.g. the connection was kicked).
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: &AppState,
    conn_id: &ConnectionId,
    writer: &mut tokio::task::JoinHandle<()>,
) {
    loop {
        tokio::select! {
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        handlers::dispatch(&state.room, conn_id, text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // pings/pongs are answered by the protocol layer
                    Some(Err(err)) => {
                        debug!(connection = %conn_id, error = %err, "socket read error");
                        break;
                    }
                }
            }
            _ = &mut *writer => break,
        }
    }
}

/// Drain the outbound queue into the socket, pinging on an interval.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<ServerEvent>,
    heartbeat: Duration,
) {
    let mut ping = tokio::time::interval(heartbeat);
    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(error = %err, "failed to serialize event");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            _ = ping.tick() => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
    let _ = sink.close().await;
}

fn generate_connection_id() -> ConnectionId {
    format!("conn_{}", uuid::Uuid::new_v4().simple())
}
