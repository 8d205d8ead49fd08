//! Service Gateway
//!
//! An API gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                              ┌─────────────────────────────────────────────────────────┐
//!                              │                        GATEWAY                           │
//!                              │                                                          │
//!     Client Request           │  ┌─────────┐    ┌─────────┐    ┌──────────────┐         │
//!     ─────────────────────────┼─▶│  http   │───▶│ routing │───▶│load_balancer │         │
//!                              │  │ server  │    │ (prefix)│    │  (strategy)  │         │
//!                              │  └────┬────┘    └─────────┘    └──────┬───────┘         │
//!                              │       │ /gateway/*                    │ select/release   │
//!                              │       ▼                               ▼                  │
//!                              │  ┌─────────┐                   ┌──────────────┐          │
//!                              │  │  admin  │──────────────────▶│   registry   │◀──┐      │
//!                              │  └─────────┘                   └──────┬───────┘   │      │
//!     Client Response          │                                       │           │      │
//!     ◀────────────────────────┼──────────── http/proxy ◀──────────────┘     health│◀─────┼──── Upstream
//!                              │                                            monitor│      │     Instances
//!                              │  ┌────────────────────────────────────────────────────┐ │
//!                              │  │  config (hot reload) · security · observability ·  │ │
//!                              │  │  lifecycle                                         │ │
//!                              │  └────────────────────────────────────────────────────┘ │
//!                              └─────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use service_gateway::config::watcher::ConfigFileWatcher;
use service_gateway::lifecycle::signals;
use service_gateway::observability::{logging, metrics};
use service_gateway::{ConfigManager, Gateway, Shutdown};

#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "API gateway with service discovery, load balancing and hot reload", long_about = None)]
struct Cli {
    /// Configuration file (.yaml, .yml, .json or .toml)
    #[arg(short, long, default_value = "config/gateway.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Config errors are fatal at startup.
    let manager = Arc::new(ConfigManager::new(&cli.config)?);
    let config = manager.config();

    logging::init(&config.observability)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "service-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let gateway = Gateway::build(manager.clone());
    let shutdown = Shutdown::new();

    let _file_watcher = match ConfigFileWatcher::new(manager.clone()).run(shutdown.subscribe()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config file watcher unavailable, hot reload disabled");
            None
        }
    };
    signals::spawn_signal_handler(shutdown.clone(), manager.clone())?;

    let listener = TcpListener::bind(("0.0.0.0", u16::try_from(config.port)?)).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    gateway.serve(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
