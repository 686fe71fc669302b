use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mock_ws_server::server::{run_server, RequestsLoggingLevel, ServerConfig};

#[derive(Parser, Debug)]
struct CliArgs {
    /// The port to listen on.
    #[clap(short, long, default_value_t = 9487)]
    pub port: u16,

    /// Seconds between heartbeat pings on each connection.
    #[clap(long, default_value_t = 30)]
    pub heartbeat_interval_secs: u64,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    let config = ServerConfig {
        port: cli_args.port,
        heartbeat_interval: Duration::from_secs(cli_args.heartbeat_interval_secs),
        requests_logging_level: cli_args.logging_level,
    };

    info!("Ready to serve at port {}!", config.port);

    let result = tokio::select! {
        result = run_server(config) => {
            info!("Server stopped: {:?}", result);
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping server");
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error during server shutdown: {}", err);
    }

    // Fixed final line, printed whether or not an error occurred.
    info!("Server closed");
    Ok(())
}
