//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/JSON/TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (defaults & semantic checks)
//!     → manager.rs (atomic swap of Arc<GatewayConfig>)
//!     → ConfigWatcher callbacks (registry, balancer, routes, health monitor)
//!
//! On file change:
//!     watcher.rs detects change
//!     → manager.load_config() (skipped when mtime unchanged)
//!     → watchers notified and joined
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes swap a whole new value
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod duration;
pub mod loader;
pub mod manager;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use manager::{ConfigManager, ConfigWatcher};
pub use schema::{GatewayConfig, LoadBalancerConfig, LogFormat, ObservabilityConfig, ServiceConfig};
