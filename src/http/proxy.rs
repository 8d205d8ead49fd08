//! Reverse-proxy path.
//!
//! # Data Flow
//! ```text
//! request
//!     → route lookup (404 when nothing matches)
//!     → bearer check on protected routes (401)
//!     → LoadBalancer::acquire (503)
//!     → upstream URI = instance URL + inbound path and query (500 if unusable)
//!     → forward once (502 on transport failure)
//!     → stamp gateway headers, stream body back
//!     → connection slot released when the body completes or is dropped
//! ```

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, Uri},
    response::{IntoResponse, Response},
    Json,
};
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;
use url::Url;

use crate::error::ProxyError;
use crate::http::request::{RequestId, RequestIdExt, X_REQUEST_ID};
use crate::http::response::{stamp_gateway_headers, ApiResponse, GATEWAY_VERSION, X_GATEWAY_VERSION};
use crate::http::server::AppState;
use crate::load_balancer::ConnectionGuard;
use crate::observability::metrics;
use crate::security::{auth, headers};

pub const X_GATEWAY_SERVICE: &str = "x-gateway-service";

/// Fallback handler for every path not claimed by the management API.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = request.request_id().cloned().unwrap_or_else(RequestId::generate);

    let Some(route) = state.router.route(&path) else {
        tracing::debug!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_request(&method, 404, "none", start);
        let status = axum::http::StatusCode::NOT_FOUND;
        return (status, Json(ApiResponse::<()>::error(status, format!("No route for {}", path)))).into_response();
    };

    if route.auth {
        if let Err(e) = auth::authorize(request.headers(), state.validator.as_ref()) {
            tracing::warn!(request_id = %request_id, service = %route.service, error = %e, "Unauthorized request");
            metrics::record_request(&method, 401, &route.service, start);
            return e.into_response();
        }
    }

    let guard = match state.balancer.acquire(&route.service) {
        Ok(guard) => guard,
        Err(e) => {
            tracing::warn!(request_id = %request_id, service = %route.service, error = %e, "No instance available");
            metrics::record_request(&method, 503, &route.service, start);
            return e.into_response();
        }
    };

    let upstream = match upstream_uri(&guard.url, request.uri()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, service = %route.service, error = %e, "Invalid instance url");
            metrics::record_request(&method, 500, &route.service, start);
            return e.into_response();
        }
    };

    let outbound = prepare_request(request, upstream, &route.service, &request_id);

    match state.client.request(outbound).await {
        Ok(response) => {
            let status = response.status();
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                service = %route.service,
                instance = %guard.id,
                status = status.as_u16(),
                latency_ms = start.elapsed().as_millis() as u64,
                "Request proxied"
            );
            metrics::record_request(&method, status.as_u16(), &route.service, start);

            let (mut parts, body) = response.into_parts();
            headers::strip_hop_by_hop(&mut parts.headers);
            stamp_gateway_headers(&mut parts.headers);
            let body = GuardedBody {
                inner: Body::new(body),
                guard: Some(guard),
            };
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                service = %route.service,
                instance = %guard.id,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(&method, 502, &route.service, start);
            ProxyError::Upstream(e.to_string()).into_response()
        }
    }
}

/// Join the instance base URL with the inbound path and query.
pub fn upstream_uri(instance_url: &str, inbound: &Uri) -> Result<Uri, ProxyError> {
    let invalid = |reason: String| ProxyError::InvalidUpstream {
        url: instance_url.to_string(),
        reason,
    };

    let base = Url::parse(instance_url).map_err(|e| invalid(e.to_string()))?;
    let host = base.host_str().ok_or_else(|| invalid("missing host".to_string()))?;
    let authority = match base.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let mut path = format!("{}{}", base.path().trim_end_matches('/'), inbound.path());
    if path.is_empty() {
        path.push('/');
    }
    let target = match inbound.query() {
        Some(query) => format!("{}://{}{}?{}", base.scheme(), authority, path, query),
        None => format!("{}://{}{}", base.scheme(), authority, path),
    };
    target.parse::<Uri>().map_err(|e| invalid(e.to_string()))
}

fn prepare_request(request: Request<Body>, upstream: Uri, service: &str, request_id: &RequestId) -> Request<Body> {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let (mut parts, body) = request.into_parts();

    let inbound_host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()));

    let headers = &mut parts.headers;
    headers::strip_hop_by_hop(headers);
    // The client derives Host from the upstream URI.
    headers.remove(header::HOST);
    headers::add_forwarded(headers, client_ip, "http", inbound_host.as_deref());
    if let Ok(value) = HeaderValue::from_str(service) {
        headers.insert(X_GATEWAY_SERVICE, value);
    }
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        headers.insert(X_REQUEST_ID, value);
    }
    headers.insert(X_GATEWAY_VERSION, HeaderValue::from_static(GATEWAY_VERSION));

    parts.uri = upstream;
    Request::from_parts(parts, body)
}

/// Upstream body that holds the instance's connection slot until the body
/// has been fully relayed, has failed, or is dropped.
struct GuardedBody {
    inner: Body,
    guard: Option<ConnectionGuard>,
}

impl HttpBody for GuardedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let polled = Pin::new(&mut self.inner).poll_frame(cx);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            self.guard.take();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
