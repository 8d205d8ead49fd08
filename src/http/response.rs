//! Response handling and transformation.
//!
//! # Responsibilities
//! - JSON envelope shared by management and error responses
//! - Stamp gateway identification headers on proxied responses
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Hop-by-hop headers stripped before relaying (see `security::headers`)

use axum::http::{HeaderMap, HeaderValue, StatusCode};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

pub const X_GATEWAY: &str = "x-gateway";
pub const X_GATEWAY_VERSION: &str = "x-gateway-version";
pub const X_RESPONSE_TIME: &str = "x-response-time";

/// Value of the `X-Gateway` response header.
pub const GATEWAY_NAME: &str = "service-gateway";
/// Value of the `X-Gateway-Version` headers and the `/health` version field.
pub const GATEWAY_VERSION: &str = "2.0.0";

/// `{"code": <status>, "message": <text>, "data": <payload?>}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

/// Add `X-Gateway`, `X-Gateway-Version` and `X-Response-Time` (RFC 3339).
pub fn stamp_gateway_headers(headers: &mut HeaderMap) {
    headers.insert(X_GATEWAY, HeaderValue::from_static(GATEWAY_NAME));
    headers.insert(X_GATEWAY_VERSION, HeaderValue::from_static(GATEWAY_VERSION));
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    if let Ok(value) = HeaderValue::from_str(&now) {
        headers.insert(X_RESPONSE_TIME, value);
    }
}
