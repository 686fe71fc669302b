//! WebSocket route handler.
//!
//! Handles WebSocket upgrade, the echo loop, the per-connection heartbeat
//! task, and cleanup.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::connection::{ConnectionRegistry, Outbound};
use crate::server::state::GuardedConnectionRegistry;
use crate::server::ServerConfig;

/// Prefix prepended to every echoed message.
pub const REPLY_PREFIX: &str = "回覆: ";

/// Payload carried by heartbeat pings.
const HEARTBEAT_PAYLOAD: &[u8] = b"heartbeat";

/// WebSocket upgrade handler.
///
/// This is the route handler for `GET /ws`. No origin check and no
/// authentication; every upgrade request is accepted. This is a test mock.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<GuardedConnectionRegistry>,
    State(config): State<ServerConfig>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, registry, config.heartbeat_interval))
}

/// Handle an established WebSocket connection.
async fn handle_socket(
    socket: WebSocket,
    registry: GuardedConnectionRegistry,
    heartbeat_interval: Duration,
) {
    let (conn_id, outgoing_rx, heartbeat_token) = registry.register().await;
    debug!("WebSocket connected: connection {}", conn_id);

    let (ws_sink, ws_stream) = socket.split();

    // Spawn task to forward outgoing frames to the WebSocket. Replies and
    // pings are serialized through the one channel, so writes for the same
    // connection never interleave.
    let outgoing_handle = tokio::spawn(forward_outgoing(ws_sink, outgoing_rx));

    // Spawn the heartbeat: first ping immediately, then one per interval
    // until the token is cancelled.
    let heartbeat_handle = tokio::spawn(run_heartbeat(
        Arc::clone(&registry),
        conn_id,
        heartbeat_interval,
        heartbeat_token,
    ));

    // Process incoming messages until the client disconnects
    process_incoming(ws_stream, conn_id, &registry).await;

    // Cleanup
    debug!("WebSocket disconnected: connection {}", conn_id);
    registry.unregister(conn_id).await;
    let _ = heartbeat_handle.await;
    outgoing_handle.abort();
}

/// Send a ping immediately, then once per interval, until cancelled.
///
/// Cancellation is asynchronous: the task observes the token at its next
/// suspension point. The entry is removed from the registry before the
/// token is cancelled, so a racing ping cannot be queued after close.
async fn run_heartbeat(
    registry: GuardedConnectionRegistry,
    conn_id: usize,
    interval: Duration,
    token: CancellationToken,
) {
    loop {
        // Fire-and-forget: a ping on a closing connection is not
        // distinguished from a delivered one.
        if let Err(err) = registry.send(conn_id, Outbound::Ping).await {
            debug!("Heartbeat ping skipped on connection {}: {}", conn_id, err);
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = token.cancelled() => break,
        }
    }
}

/// Forward frames from the outgoing channel to the WebSocket.
async fn forward_outgoing(
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<Outbound>,
) {
    while let Some(frame) = outgoing_rx.recv().await {
        let message = match frame {
            Outbound::Text(text) => Message::Text(text.into()),
            Outbound::Ping => Message::Ping(Bytes::from_static(HEARTBEAT_PAYLOAD)),
        };
        if ws_sink.send(message).await.is_err() {
            break;
        }
    }
}

/// Process incoming messages from the WebSocket.
async fn process_incoming(
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    conn_id: usize,
    registry: &ConnectionRegistry,
) {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = echo_reply(&text);
                // A failed send is logged and dropped, never retried.
                if let Err(err) = registry.send(conn_id, Outbound::Text(reply)).await {
                    warn!(
                        "Failed to send echo reply on connection {}: {}",
                        conn_id, err
                    );
                }
            }
            Ok(Message::Binary(_)) => {
                debug!("Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) => {
                // Axum/tungstenite handles pong automatically
                debug!("Received ping");
            }
            Ok(Message::Pong(_)) => {
                debug!("Received pong");
            }
            Ok(Message::Close(_)) => {
                debug!("Received close frame");
                break;
            }
            Err(e) => {
                debug!("WebSocket error: {}", e);
                break;
            }
        }
    }
}

/// Build the reply for an inbound text payload.
fn echo_reply(text: &str) -> String {
    format!("{}{}", REPLY_PREFIX, text)
}
