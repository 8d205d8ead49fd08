//! Error taxonomy for the gateway.
//!
//! Each concern owns one enum. Errors that reach the HTTP surface implement
//! `IntoResponse` so handlers can return them with `?`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::config::validation::ValidationError;
use crate::http::response::ApiResponse;

/// Configuration loading, validation and persistence failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported config file format: {0:?}")]
    UnsupportedFormat(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialize error: {0}")]
    Serialize(String),

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Registry lookups and mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("instance {id} not found in service {service}")]
    InstanceNotFound { service: String, id: String },

    #[error("no healthy instances for service: {0}")]
    NoHealthyInstances(String),

    #[error("invalid instance: {0}")]
    InvalidInstance(String),
}

impl RegistryError {
    fn status(&self) -> StatusCode {
        match self {
            RegistryError::ServiceNotFound(_) | RegistryError::NoHealthyInstances(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RegistryError::InstanceNotFound { .. } => StatusCode::NOT_FOUND,
            RegistryError::InvalidInstance(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ApiResponse::<()>::error(status, self.to_string()))).into_response()
    }
}

/// Instance selection failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalancerError {
    #[error("no available instances for service: {0}")]
    NoAvailableInstances(String),

    #[error("no healthy instances for service: {0}")]
    NoHealthyInstances(String),
}

impl IntoResponse for BalancerError {
    fn into_response(self) -> Response {
        let status = StatusCode::SERVICE_UNAVAILABLE;
        let message = format!("Service unavailable: {}", self);
        (status, Json(ApiResponse::<()>::error(status, message))).into_response()
    }
}

/// Failures on the reverse-proxy path.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid upstream url {url}: {reason}")]
    InvalidUpstream { url: String, reason: String },

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::InvalidUpstream { .. } => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ApiResponse::<()>::error(status, "Invalid service URL"))).into_response()
            }
            ProxyError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                r#"{"error":"Bad Gateway","message":"Failed to proxy request"}"#,
            )
                .into_response(),
        }
    }
}

/// Rejected management API calls.
#[derive(Debug, Error)]
pub enum ManagementError {
    #[error("Invalid request: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl IntoResponse for ManagementError {
    fn into_response(self) -> Response {
        match self {
            ManagementError::InvalidPayload(_) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ApiResponse::<()>::error(status, self.to_string()))).into_response()
            }
            // On the management surface an unknown service is a missing resource.
            ManagementError::Registry(e @ RegistryError::ServiceNotFound(_)) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ApiResponse::<()>::error(status, e.to_string()))).into_response()
            }
            ManagementError::Registry(e) => e.into_response(),
        }
    }
}
