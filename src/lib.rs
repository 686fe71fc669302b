//! Mock WebSocket Echo Server Library
//!
//! This library exposes the internal modules so the end-to-end tests can
//! build and spawn the app in-process.

pub mod server;

// Re-export commonly used types for convenience
pub use server::{run_server, RequestsLoggingLevel, ServerConfig};
