//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A second SIGTERM/SIGINT forces exit
//! - SIGHUP triggers config reload, not shutdown

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::ConfigManager;
use crate::lifecycle::Shutdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Terminate,
    Reload,
}

#[cfg(unix)]
struct Signals {
    term: tokio::signal::unix::Signal,
    hup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            term: signal(SignalKind::terminate())?,
            hup: signal(SignalKind::hangup())?,
        })
    }

    async fn next(&mut self) -> Signal {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => Signal::Terminate,
            _ = self.term.recv() => Signal::Terminate,
            _ = self.hup.recv() => Signal::Reload,
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> Signal {
        let _ = tokio::signal::ctrl_c().await;
        Signal::Terminate
    }
}

/// Translate OS signals into shutdown and reload actions until the process exits.
pub fn spawn_signal_handler(shutdown: Shutdown, config: Arc<ConfigManager>) -> std::io::Result<JoinHandle<()>> {
    let mut signals = Signals::new()?;

    Ok(tokio::spawn(async move {
        let mut terminating = false;
        loop {
            match signals.next().await {
                Signal::Terminate if terminating => {
                    tracing::warn!("Second termination signal, forcing exit");
                    std::process::exit(1);
                }
                Signal::Terminate => {
                    tracing::info!("Termination signal received, shutting down gracefully");
                    terminating = true;
                    shutdown.trigger();
                }
                Signal::Reload => match config.load_config().await {
                    Ok(true) => tracing::info!("Configuration reloaded on SIGHUP"),
                    Ok(false) => tracing::info!("SIGHUP received, configuration unchanged"),
                    Err(e) => tracing::error!(error = %e, "Configuration reload failed, keeping previous config"),
                },
            }
        }
    }))
}
