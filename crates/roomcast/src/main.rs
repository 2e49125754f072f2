//! Roomcast relay server binary.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use roomcast_server::metrics;
use roomcast_server::{RelayServer, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "roomcast", about = "WebSocket room relay server")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind (0 picks a free port).
    #[arg(long, default_value = "8787")]
    port: u16,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let metrics_handle = metrics::install_recorder();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        ..ServerConfig::default()
    };
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    let server = RelayServer::new(config, metrics_handle);
    let (addr, listener) = server
        .listen()
        .await
        .context("failed to bind server address")?;
    info!("roomcast listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("ctrl-c received, shutting down");
    server
        .shutdown()
        .graceful_shutdown(listener, shutdown_timeout)
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_default_host() {
        let cli = Cli::parse_from(["roomcast"]);
        assert_eq!(cli.host, "127.0.0.1");
    }

    #[test]
    fn cli_default_port() {
        let cli = Cli::parse_from(["roomcast"]);
        assert_eq!(cli.port, 8787);
    }

    #[test]
    fn cli_custom_host_and_port() {
        let cli = Cli::parse_from(["roomcast", "--host", "0.0.0.0", "--port", "9000"]);
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 9000);
    }

    #[test]
    fn cli_default_log_level() {
        let cli = Cli::parse_from(["roomcast"]);
        assert_eq!(cli.log_level, "info");
    }
}
