//! WebSocket echo infrastructure.
//!
//! One connection means one client session from handshake to disconnect:
//! text frames are echoed back with a fixed prefix, and a heartbeat task
//! pings the client periodically until the connection closes.

pub mod connection;
pub mod handler;

pub use connection::{ConnectionRegistry, Outbound, SendError};
pub use handler::ws_handler;
