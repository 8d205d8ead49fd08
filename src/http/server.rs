//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with management handlers and the proxy fallback
//! - Wire up middleware (tracing, timeout, request ID, rate limit, security headers, CORS)
//! - Bind server to listener and stop on the shutdown signal

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware,
    Router,
};
use chrono::{DateTime, Utc};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{util::option_layer, ServiceBuilder};
use tower_http::{
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::config::ConfigManager;
use crate::http::proxy::proxy_handler;
use crate::http::request::RequestIdLayer;
use crate::load_balancer::LoadBalancer;
use crate::registry::ServiceRegistry;
use crate::routing::Router as RouteTable;
use crate::security::{cors, rate_limit, RateLimiter, TokenValidator};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConfigManager>,
    pub registry: Arc<ServiceRegistry>,
    pub balancer: Arc<LoadBalancer>,
    pub router: Arc<RouteTable>,
    pub limiter: Arc<RateLimiter>,
    pub validator: Arc<dyn TokenValidator>,
    pub client: Client<HttpConnector, Body>,
    pub started: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: Arc<ConfigManager>,
        registry: Arc<ServiceRegistry>,
        balancer: Arc<LoadBalancer>,
        router: Arc<RouteTable>,
        limiter: Arc<RateLimiter>,
        validator: Arc<dyn TokenValidator>,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            config,
            registry,
            balancer,
            router,
            limiter,
            validator,
            client,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// `timeout` bounds each request up to the response head.
    pub fn new(state: AppState, timeout: Duration) -> Self {
        Self {
            router: Self::build_router(state, timeout),
        }
    }

    /// Build the Axum router with all middleware layers. CORS origins are
    /// taken from the config current at build time.
    #[allow(deprecated)]
    pub fn build_router(state: AppState, timeout: Duration) -> Router {
        let limiter = state.limiter.clone();
        let cors = cors::cors_layer(&state.config.config().cors);

        let security = ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_XSS_PROTECTION,
                HeaderValue::from_static("1; mode=block"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static("max-age=31536000; includeSubDomains"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::REFERRER_POLICY,
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static("default-src 'self'"),
            ));

        admin::management_router()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(limiter, rate_limit::rate_limit_middleware))
            .layer(TimeoutLayer::new(timeout))
            .layer(security)
            .layer(option_layer(cors))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener, until
    /// `shutdown` fires. In-flight requests are drained first.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
