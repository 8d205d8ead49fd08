//! Cross-origin access for browser clients.
//!
//! Only origins on the configured list are echoed back, and credentials are
//! allowed for them. Every `OPTIONS` request is answered here as a preflight
//! and never reaches the proxy.
//! An empty list disables CORS entirely, so upstream `OPTIONS` handling is
//! untouched.

use axum::http::{header, HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::schema::CorsConfig;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::X_RESPONSE_TIME;

const X_REQUESTED_WITH: &str = "x-requested-with";
const MAX_AGE: Duration = Duration::from_secs(86_400);

/// Build the CORS layer, or `None` when no origin is allowed.
pub fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }
    tracing::debug!(origins = origins.len(), "CORS enabled");

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
                Method::PATCH,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                HeaderName::from_static(X_REQUESTED_WITH),
                HeaderName::from_static(X_REQUEST_ID),
            ])
            .expose_headers([
                HeaderName::from_static(X_REQUEST_ID),
                HeaderName::from_static(X_RESPONSE_TIME),
            ])
            .allow_credentials(true)
            .max_age(MAX_AGE),
    )
}
