//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile `services.*.prefix` into a route table
//! - Look up the matching route for a request path
//! - Swap the table atomically on config reload
//!
//! # Design Decisions
//! - Each compiled table is immutable; reloads replace it whole
//! - Routes are kept sorted by prefix length so the first match is the longest
//! - Explicit `None` rather than a silent default route

use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::manager::{ConfigWatcher, WatcherResult};
use crate::config::schema::GatewayConfig;
use crate::routing::matcher::PathPrefixMatcher;

/// A proxied path prefix bound to a logical service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub service: String,
    pub matcher: PathPrefixMatcher,
    /// Require a bearer token before proxying.
    pub auth: bool,
}

/// Listing entry for `GET /gateway/routes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    pub auth: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut routes: Vec<Route> = config
            .services
            .iter()
            .map(|(name, service)| Route {
                service: name.clone(),
                matcher: PathPrefixMatcher::new(service.prefix.clone()),
                auth: service.auth,
            })
            .collect();
        // Longest prefix first; ties resolve by service name for determinism.
        routes.sort_by(|a, b| {
            b.matcher
                .specificity()
                .cmp(&a.matcher.specificity())
                .then_with(|| a.service.cmp(&b.service))
        });
        Self { routes }
    }

    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Live route table shared by the proxy handler.
#[derive(Debug, Default)]
pub struct Router {
    table: ArcSwap<RouteTable>,
}

impl Router {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::from_config(config)),
        }
    }

    pub fn table(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Returns the matched route, cloned out of the current table.
    pub fn route(&self, path: &str) -> Option<Route> {
        self.table.load().match_path(path).cloned()
    }

    pub fn reload(&self, config: &GatewayConfig) {
        let table = RouteTable::from_config(config);
        tracing::info!(routes = table.len(), "Route table rebuilt");
        self.table.store(Arc::new(table));
    }
}

#[async_trait]
impl ConfigWatcher for Router {
    fn name(&self) -> &str {
        "router"
    }

    async fn on_config_changed(&self, config: Arc<GatewayConfig>) -> WatcherResult {
        self.reload(&config);
        Ok(())
    }
}
