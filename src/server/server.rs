use anyhow::Result;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::info;

use axum::{
    extract::State,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::websocket::{ws_handler, ConnectionRegistry};
use super::{log_requests, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub active_connections: usize,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        active_connections: state.connection_registry.active_connections().await,
    };
    Json(stats)
}

pub fn make_app(config: ServerConfig) -> Router {
    let state = ServerState {
        config,
        start_time: Instant::now(),
        connection_registry: Arc::new(ConnectionRegistry::new()),
    };

    let app: Router = Router::new()
        .route("/", get(home))
        .route("/ws", get(ws_handler))
        .with_state(state.clone());

    app.layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let port = config.port;
    let app = make_app(config);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("WebSocket echo server running on port {}", port);

    Ok(axum::serve(listener, app).await?)
}
