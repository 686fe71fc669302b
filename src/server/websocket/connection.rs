//! WebSocket connection registry.
//!
//! Tracks all active connections in a single table. Each entry owns the
//! outbound channel to its socket's write half and the cancellation token
//! for its heartbeat task. An entry's token and sender are only touched by
//! that connection's own tasks, never by another connection's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Frame queued for the write half of a connection's socket.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Text reply frame.
    Text(String),
    /// Heartbeat ping control frame.
    Ping,
}

/// Error type for send operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SendError {
    /// The connection is not registered (never existed, or already closed).
    #[error("connection is not registered")]
    NotConnected,
    /// The connection channel is closed (write half went away).
    #[error("connection channel is closed")]
    Disconnected,
}

/// State for one active connection.
struct ConnectionEntry {
    sender: mpsc::Sender<Outbound>,
    heartbeat: CancellationToken,
}

/// Manages all active WebSocket connections.
///
/// Connection ids are assigned from a monotonic counter; a reconnecting
/// client gets a fresh id, entries are never reused.
pub struct ConnectionRegistry {
    next_id: AtomicUsize,
    connections: RwLock<HashMap<usize, ConnectionEntry>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Create a new connection registry.
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(0),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the assigned connection id, a receiver the caller should
    /// forward to the WebSocket's write half, and the heartbeat token for
    /// this connection. The token is cancelled by [`unregister`].
    ///
    /// [`unregister`]: ConnectionRegistry::unregister
    pub async fn register(&self) -> (usize, mpsc::Receiver<Outbound>, CancellationToken) {
        let (tx, rx) = mpsc::channel(32);
        let token = CancellationToken::new();
        let conn_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut conns = self.connections.write().await;
        conns.insert(
            conn_id,
            ConnectionEntry {
                sender: tx,
                heartbeat: token.clone(),
            },
        );

        (conn_id, rx, token)
    }

    /// Unregister a connection (called on disconnect).
    ///
    /// Removes the entry and cancels its heartbeat token so no further
    /// ping fires. Calling this for an id that is already gone is a no-op.
    pub async fn unregister(&self, conn_id: usize) {
        let mut conns = self.connections.write().await;
        if let Some(entry) = conns.remove(&conn_id) {
            entry.heartbeat.cancel();
        }
    }

    /// Queue a frame on a connection's socket.
    pub async fn send(&self, conn_id: usize, frame: Outbound) -> Result<(), SendError> {
        let conns = self.connections.read().await;
        match conns.get(&conn_id) {
            Some(entry) => entry
                .sender
                .send(frame)
                .await
                .map_err(|_| SendError::Disconnected),
            None => Err(SendError::NotConnected),
        }
    }

    /// Check if a connection is currently registered.
    pub async fn is_connected(&self, conn_id: usize) -> bool {
        self.connections.read().await.contains_key(&conn_id)
    }

    /// Number of currently open connections.
    pub async fn active_connections(&self) -> usize {
        self.connections.read().await.len()
    }
}
