//! Live configuration with hot reload.
//!
//! # Responsibilities
//! - Hold the active [`GatewayConfig`] behind an `ArcSwap`
//! - Re-read the file only when its modification time moved
//! - Persist programmatic updates in the file's own format
//! - Notify registered [`ConfigWatcher`]s after every accepted change
//!
//! A rejected reload leaves the previous config active. Watcher
//! notifications run concurrently but are joined before the reload returns.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::task::JoinSet;

use crate::config::loader::{self, ConfigFormat};
use crate::config::schema::{GatewayConfig, ServiceConfig};
use crate::error::ConfigError;

pub type WatcherResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Receives every accepted configuration change.
#[async_trait]
pub trait ConfigWatcher: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    async fn on_config_changed(&self, config: Arc<GatewayConfig>) -> WatcherResult;
}

/// Where configuration bytes come from.
pub trait ConfigSource: Send + Sync + fmt::Debug {
    fn path(&self) -> &Path;
    fn modified(&self) -> io::Result<SystemTime>;
    fn read(&self) -> io::Result<String>;
    fn write(&self, content: &str) -> io::Result<()>;
}

/// A config file on local disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> io::Result<SystemTime> {
        std::fs::metadata(&self.path)?.modified()
    }

    fn read(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }

    fn write(&self, content: &str) -> io::Result<()> {
        std::fs::write(&self.path, content)
    }
}

pub struct ConfigManager {
    source: Box<dyn ConfigSource>,
    format: ConfigFormat,
    current: ArcSwap<GatewayConfig>,
    last_modified: Mutex<Option<SystemTime>>,
    /// Serializes reloads and updates against each other.
    reload_lock: tokio::sync::Mutex<()>,
    watchers: RwLock<Vec<Arc<dyn ConfigWatcher>>>,
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("source", &self.source)
            .field("format", &self.format)
            .field("watchers", &self.watchers.read().len())
            .finish()
    }
}

impl ConfigManager {
    /// Load the config file at `path`. Any failure here is fatal to startup.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Self::with_source(Box::new(FileSource::new(path)))
    }

    pub fn with_source(source: Box<dyn ConfigSource>) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(source.path())?;
        let modified = source.modified().map_err(|e| io_error(source.as_ref(), e))?;
        let content = source.read().map_err(|e| io_error(source.as_ref(), e))?;
        let config = loader::prepare(loader::parse(&content, format)?)?;

        tracing::info!(
            path = %source.path().display(),
            services = config.services.len(),
            "Config loaded"
        );

        Ok(Self {
            source,
            format,
            current: ArcSwap::from_pointee(config),
            last_modified: Mutex::new(Some(modified)),
            reload_lock: tokio::sync::Mutex::new(()),
            watchers: RwLock::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        self.source.path()
    }

    /// The active configuration.
    pub fn config(&self) -> Arc<GatewayConfig> {
        self.current.load_full()
    }

    pub fn service_config(&self, name: &str) -> Option<ServiceConfig> {
        self.current.load().services.get(name).cloned()
    }

    /// Re-read the file if it changed since the last load.
    ///
    /// Returns `Ok(false)` without parsing when the modification time is
    /// unchanged. On success every watcher has run before this returns.
    pub async fn load_config(&self) -> Result<bool, ConfigError> {
        let _guard = self.reload_lock.lock().await;

        let modified = self
            .source
            .modified()
            .map_err(|e| io_error(self.source.as_ref(), e))?;
        if *self.last_modified.lock() == Some(modified) {
            tracing::trace!(path = %self.path().display(), "Config unchanged, skipping reload");
            return Ok(false);
        }

        let content = self
            .source
            .read()
            .map_err(|e| io_error(self.source.as_ref(), e))?;
        let config = match loader::parse(&content, self.format).and_then(loader::prepare) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                tracing::error!(
                    path = %self.path().display(),
                    error = %e,
                    "Rejected config reload, keeping current configuration"
                );
                return Err(e);
            }
        };

        self.current.store(config.clone());
        *self.last_modified.lock() = Some(modified);
        tracing::info!(
            path = %self.path().display(),
            services = config.services.len(),
            "Config reloaded"
        );

        self.notify_watchers(config).await;
        Ok(true)
    }

    /// Replace the active config, persist it and notify watchers.
    pub async fn update_config(&self, config: GatewayConfig) -> Result<(), ConfigError> {
        let _guard = self.reload_lock.lock().await;
        self.install(config).await
    }

    /// Add or replace one service and persist.
    pub async fn add_service(&self, name: &str, service: ServiceConfig) -> Result<(), ConfigError> {
        let _guard = self.reload_lock.lock().await;
        let mut config = (*self.config()).clone();
        config.services.insert(name.to_string(), service);
        self.install(config).await
    }

    /// Remove one service and persist. Returns `false` if it was not configured.
    pub async fn remove_service(&self, name: &str) -> Result<bool, ConfigError> {
        let _guard = self.reload_lock.lock().await;
        let mut config = (*self.config()).clone();
        if config.services.remove(name).is_none() {
            return Ok(false);
        }
        self.install(config).await?;
        Ok(true)
    }

    async fn install(&self, config: GatewayConfig) -> Result<(), ConfigError> {
        let config = Arc::new(loader::prepare(config)?);
        let rendered = loader::serialize(&config, self.format)?;
        self.source
            .write(&rendered)
            .map_err(|e| io_error(self.source.as_ref(), e))?;

        // Our own write must not look like an external edit on the next reload.
        *self.last_modified.lock() = self.source.modified().ok();
        self.current.store(config.clone());
        tracing::info!(path = %self.path().display(), "Config updated and saved");

        self.notify_watchers(config).await;
        Ok(())
    }

    pub fn add_watcher(&self, watcher: Arc<dyn ConfigWatcher>) {
        self.watchers.write().push(watcher);
    }

    /// Remove a watcher previously added. Returns `false` if it was not registered.
    pub fn remove_watcher(&self, watcher: &Arc<dyn ConfigWatcher>) -> bool {
        let mut watchers = self.watchers.write();
        let before = watchers.len();
        watchers.retain(|w| !Arc::ptr_eq(w, watcher));
        watchers.len() != before
    }

    async fn notify_watchers(&self, config: Arc<GatewayConfig>) {
        let watchers = self.watchers.read().clone();
        let mut tasks = JoinSet::new();
        for watcher in watchers {
            let config = config.clone();
            tasks.spawn(async move {
                let result = watcher.on_config_changed(config).await;
                (watcher.name().to_string(), result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(()))) => tracing::debug!(watcher = %name, "Config watcher applied change"),
                Ok((name, Err(e))) => tracing::warn!(watcher = %name, error = %e, "Config watcher error"),
                Err(e) => tracing::error!(error = %e, "Config watcher task failed"),
            }
        }
    }
}

fn io_error(source: &dyn ConfigSource, e: io::Error) -> ConfigError {
    ConfigError::Io {
        path: source.path().display().to_string(),
        source: e,
    }
}
