//! Service instance data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

use crate::config::validation::DEFAULT_HEALTH_CHECK_PATH;

/// How an instance entered the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceSource {
    /// Seeded from the config file; reconciled on reload.
    Config,
    /// Registered through the management API; in memory only.
    Dynamic,
}

/// One backend endpoint of a logical service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceInstance {
    pub id: String,
    pub service_name: String,
    pub url: String,
    pub weight: u32,
    pub healthy: bool,
    /// In-flight proxied exchanges.
    pub connections: usize,
    pub last_check: DateTime<Utc>,
    #[serde(rename = "response_time_ms", serialize_with = "as_millis")]
    pub response_time: Duration,
    pub register_time: DateTime<Utc>,
    pub failure_count: u32,
    pub health_check_path: String,
    pub source: InstanceSource,
}

impl ServiceInstance {
    pub fn new(
        service_name: impl Into<String>,
        id: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            service_name: service_name.into(),
            url: url.into(),
            weight: 1,
            healthy: true,
            connections: 0,
            last_check: now,
            response_time: Duration::ZERO,
            register_time: now,
            failure_count: 0,
            health_check_path: DEFAULT_HEALTH_CHECK_PATH.to_string(),
            source: InstanceSource::Dynamic,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_health_check_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        if !path.is_empty() {
            self.health_check_path = path;
        }
        self
    }

    pub fn with_source(mut self, source: InstanceSource) -> Self {
        self.source = source;
        self
    }

    /// Full URL probed by the health monitor.
    pub fn health_url(&self) -> String {
        let path = if self.health_check_path.is_empty() {
            DEFAULT_HEALTH_CHECK_PATH
        } else {
            &self.health_check_path
        };
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

fn as_millis<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(d.as_millis() as u64)
}

/// Instance id used for the instance seeded from a config entry.
pub fn config_instance_id(service_name: &str) -> String {
    format!("{}-1", service_name)
}
