//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test servers.
//! Each test gets an isolated server on a random port.

use super::constants::*;
use mock_ws_server::server::server::make_app;
use mock_ws_server::server::{RequestsLoggingLevel, ServerConfig};
use std::time::Duration;
use tokio::net::TcpListener;

/// Test server instance listening on a random port
///
/// When dropped, the server shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    // Private field - keep the shutdown channel alive until drop
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server with the short test heartbeat interval.
    pub async fn spawn() -> Self {
        Self::spawn_with_heartbeat(Duration::from_millis(TEST_HEARTBEAT_INTERVAL_MS)).await
    }

    /// Spawns a new test server with an explicit heartbeat interval.
    ///
    /// This function:
    /// 1. Binds to a random port (127.0.0.1:0)
    /// 2. Spawns the server in a background task
    /// 3. Waits for the server to be ready
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready
    /// within the timeout.
    pub async fn spawn_with_heartbeat(heartbeat_interval: Duration) -> Self {
        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            heartbeat_interval,
            requests_logging_level: RequestsLoggingLevel::None,
        };

        let app = make_app(config);

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Fetches the stats route and returns the active connection count.
    pub async fn active_connections(&self) -> usize {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        let stats: serde_json::Value = client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Stats request failed")
            .json()
            .await
            .expect("Stats response was not JSON");

        stats["active_connections"]
            .as_u64()
            .expect("active_connections missing from stats") as usize
    }

    /// Waits for the server to become ready by polling the stats endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    // Server is ready
                    return;
                }
                _ => {
                    // Server not ready yet, wait and retry
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Send shutdown signal
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
