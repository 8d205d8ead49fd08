//! Configuration validation.
//!
//! # Responsibilities
//! - Fill context-dependent defaults (route prefixes, probe paths)
//! - Validate value ranges (port, timeouts, weights, rate limit)
//! - Check every service URL parses as plain http
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/health";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid port: {0} (expected 1-65535)")]
    InvalidPort(u32),

    #[error("{0} must be positive")]
    ZeroTimeout(&'static str),

    #[error("rate limit cannot be negative: {0}")]
    NegativeRateLimit(i64),

    #[error("service {0}: URL cannot be empty")]
    EmptyUrl(String),

    #[error("service {service}: invalid URL {url:?} (expected http://host[:port])")]
    InvalidUrl { service: String, url: String },

    #[error("service {0}: weight cannot be negative")]
    NegativeWeight(String),

    #[error("service {0}: weight exceeds {max}", max = u32::MAX)]
    WeightTooLarge(String),

    #[error("service {service}: {field} must start with '/'")]
    InvalidPath { service: String, field: &'static str },

    #[error("load_balancer.max_concurrent_checks must be positive")]
    ZeroConcurrency,

    #[error("invalid metrics address: {0}")]
    InvalidMetricsAddress(String),

    #[error("invalid CORS origin {0:?} (expected scheme://host[:port], no wildcard)")]
    InvalidCorsOrigin(String),
}

/// Fill defaults that depend on context rather than on the field alone.
pub fn apply_defaults(config: &mut GatewayConfig) {
    for (name, service) in config.services.iter_mut() {
        if service.prefix.is_empty() {
            service.prefix = format!("/{}", name);
        }
        if service.health_check_path.is_empty() {
            service.health_check_path = DEFAULT_HEALTH_CHECK_PATH.to_string();
        }
    }
    if config.observability.log_level.is_empty() {
        config.observability.log_level = "info".to_string();
    }
}

/// Validate a configuration with defaults applied.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.port == 0 || config.port > u16::MAX as u32 {
        errors.push(ValidationError::InvalidPort(config.port));
    }
    if config.timeout == Duration::ZERO {
        errors.push(ValidationError::ZeroTimeout("timeout"));
    }
    if config.rate_limit < 0 {
        errors.push(ValidationError::NegativeRateLimit(config.rate_limit));
    }

    for (name, service) in &config.services {
        if service.url.trim().is_empty() {
            errors.push(ValidationError::EmptyUrl(name.clone()));
        } else if !is_http_url(&service.url) {
            errors.push(ValidationError::InvalidUrl {
                service: name.clone(),
                url: service.url.clone(),
            });
        }
        if service.weight < 0 {
            errors.push(ValidationError::NegativeWeight(name.clone()));
        } else if service.weight > u32::MAX as i64 {
            errors.push(ValidationError::WeightTooLarge(name.clone()));
        }
        if !service.prefix.is_empty() && !service.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPath {
                service: name.clone(),
                field: "prefix",
            });
        }
        if !service.health_check_path.is_empty() && !service.health_check_path.starts_with('/') {
            errors.push(ValidationError::InvalidPath {
                service: name.clone(),
                field: "health_check_path",
            });
        }
    }

    let lb = &config.load_balancer;
    if lb.check_interval == Duration::ZERO {
        errors.push(ValidationError::ZeroTimeout("load_balancer.check_interval"));
    }
    if lb.check_timeout == Duration::ZERO {
        errors.push(ValidationError::ZeroTimeout("load_balancer.check_timeout"));
    }
    if lb.max_concurrent_checks == 0 {
        errors.push(ValidationError::ZeroConcurrency);
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }

    for origin in &config.cors.allowed_origins {
        if !is_origin(origin) {
            errors.push(ValidationError::InvalidCorsOrigin(origin.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Upstreams are dialed with a plain TCP connector, so `https` is refused here
/// rather than failing on every proxied request.
pub(crate) fn is_http_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => url.scheme() == "http" && url.host().is_some(),
        Err(_) => false,
    }
}

/// A serialized origin: scheme and host, optional port, nothing else.
fn is_origin(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => {
            url.host().is_some()
                && url.path() == "/"
                && !raw.ends_with('/')
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}
