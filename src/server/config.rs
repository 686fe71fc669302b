use std::time::Duration;

use super::RequestsLoggingLevel;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Delay between heartbeat pings on each connection. The first ping is
    /// sent immediately on open.
    pub heartbeat_interval: Duration,
    pub requests_logging_level: RequestsLoggingLevel,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 9487,
            heartbeat_interval: Duration::from_secs(30),
            requests_logging_level: RequestsLoggingLevel::Path,
        }
    }
}
