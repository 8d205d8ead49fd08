//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! Numeric and boolean fields get their defaults from serde when absent;
//! string fields whose default depends on context are filled in by
//! [`crate::config::validation::apply_defaults`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::duration;
use crate::load_balancer::Strategy;

/// Root configuration for the gateway.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u32,

    /// Request timeout applied to every inbound request.
    #[serde(default = "default_timeout", with = "duration")]
    pub timeout: Duration,

    /// Requests per second allowed per client IP. 0 disables limiting.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: i64,

    /// Upstream services keyed by logical name.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,

    /// Selection strategy and health checking.
    #[serde(default)]
    pub load_balancer: LoadBalancerConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Browser cross-origin access.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            timeout: default_timeout(),
            rate_limit: default_rate_limit(),
            services: BTreeMap::new(),
            load_balancer: LoadBalancerConfig::default(),
            observability: ObservabilityConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

fn default_port() -> u32 {
    8080
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_rate_limit() -> i64 {
    1000
}

/// One upstream service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Base URL of the instance seeded from config.
    #[serde(default)]
    pub url: String,

    /// Path prefix routed to this service. Defaults to `/<name>`.
    #[serde(default)]
    pub prefix: String,

    /// Weight for weighted selection.
    #[serde(default = "default_weight")]
    pub weight: i64,

    /// Health probe path. Defaults to `/health`.
    #[serde(default)]
    pub health_check_path: String,

    /// Require a bearer token before proxying.
    #[serde(default)]
    pub auth: bool,
}

impl ServiceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            prefix: String::new(),
            weight: default_weight(),
            health_check_path: String::new(),
            auth: false,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }
}

fn default_weight() -> i64 {
    1
}

/// Load balancer and health check settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoadBalancerConfig {
    #[serde(default)]
    pub strategy: Strategy,

    /// Enable the periodic health monitor.
    #[serde(default = "default_true")]
    pub health_check: bool,

    #[serde(default = "default_check_interval", with = "duration")]
    pub check_interval: Duration,

    #[serde(default = "default_check_timeout", with = "duration")]
    pub check_timeout: Duration,

    /// Upper bound on probes in flight during one tick.
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            health_check: true,
            check_interval: default_check_interval(),
            check_timeout: default_check_timeout(),
            max_concurrent_checks: default_max_concurrent_checks(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_check_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_concurrent_checks() -> usize {
    32
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// CORS settings. Read at startup only.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins allowed to call the gateway from a browser.
    /// An empty list turns CORS handling off.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: [
                "http://localhost:3000",
                "http://localhost:8080",
                "http://127.0.0.1:3000",
                "http://127.0.0.1:8080",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}
