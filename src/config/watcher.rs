//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::config::manager::ConfigManager;

/// Triggers [`ConfigManager::load_config`] when the config file changes.
pub struct ConfigFileWatcher {
    manager: Arc<ConfigManager>,
}

impl ConfigFileWatcher {
    pub fn new(manager: Arc<ConfigManager>) -> Self {
        Self { manager }
    }

    /// Start watching. The returned watcher must be kept alive; the reload
    /// task runs until `shutdown` fires. Must be called inside a Tokio runtime.
    pub fn run(
        self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RecommendedWatcher, notify::Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let path = self.manager.path().to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(5)),
        )?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        let manager = self.manager;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = rx.recv() => {
                        if event.is_none() {
                            break;
                        }
                        // Editors emit bursts of events; the mtime check inside
                        // load_config turns the duplicates into no-ops.
                        while rx.try_recv().is_ok() {}
                        tracing::info!("Config file change detected, reloading...");
                        if let Err(e) = manager.load_config().await {
                            tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("Config watcher stopped");
        });

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
