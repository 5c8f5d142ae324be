//! scrawl-server: shared drawing-surface relay.
//!
//! Accepts WebSocket connections, groups them into rooms, and relays strokes
//! between the members of each room.

use clap::Parser;
use scrawl_server::{ConfigOverrides, ScrawlServer, ServerConfig};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// scrawl-server: shared drawing-surface relay
#[derive(Parser, Debug)]
#[command(name = "scrawl-server", version, about = "Shared drawing-surface relay")]
struct Cli {
    /// Listen address
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file path
    #[arg(long, default_value = "~/.scrawl/config.toml")]
    config: String,

    /// Outbound queue capacity per connection (messages)
    #[arg(long)]
    send_queue: Option<usize>,

    /// Largest accepted inbound message (bytes)
    #[arg(long)]
    max_message_size: Option<usize>,

    /// Seconds between stats log lines (0 disables)
    #[arg(long)]
    stats_interval: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    use tracing_subscriber::EnvFilter;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting scrawl-server");

    // Load server config (file + CLI overrides)
    let config_path = PathBuf::from(&cli.config);
    let overrides = ConfigOverrides {
        host: cli.host,
        port: cli.port,
        send_queue: cli.send_queue,
        max_message_size: cli.max_message_size,
        stats_interval: cli.stats_interval,
    };
    let server_config = match ServerConfig::load(Some(&config_path), overrides) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let server = ScrawlServer::new(server_config);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        _ = shutdown_signal() => {
            info!("received shutdown signal");
        }
    }

    info!("scrawl-server stopped");
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
