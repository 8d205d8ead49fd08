//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems from the loaded configuration, in dependency order
//! - Subscribe every reloadable subsystem to config changes
//! - Start background tasks (health checks) and serve traffic
//!
//! # Design Decisions
//! - Fail fast: config errors are fatal before anything is built
//! - Listeners start last (traffic only when ready)
//! - `port` and `timeout` are read once; other settings follow reloads

use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ConfigManager;
use crate::health::HealthMonitor;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::Shutdown;
use crate::load_balancer::LoadBalancer;
use crate::registry::{RegistrySync, ServiceRegistry};
use crate::routing::Router;
use crate::security::{MinLengthValidator, RateLimiter, TokenValidator};

/// A fully wired gateway, ready to serve.
pub struct Gateway {
    state: AppState,
    monitor: Arc<HealthMonitor>,
}

impl Gateway {
    pub fn build(config: Arc<ConfigManager>) -> Self {
        Self::with_validator(config, Arc::new(MinLengthValidator::default()))
    }

    pub fn with_validator(config: Arc<ConfigManager>, validator: Arc<dyn TokenValidator>) -> Self {
        let snapshot = config.config();

        let registry = Arc::new(ServiceRegistry::new());
        registry.reconcile(&snapshot);

        let balancer = Arc::new(LoadBalancer::new(registry.clone(), snapshot.load_balancer.strategy));
        let router = Arc::new(Router::new(&snapshot));
        let limiter = Arc::new(RateLimiter::new(u64::try_from(snapshot.rate_limit).unwrap_or(0)));
        let monitor = Arc::new(HealthMonitor::new(registry.clone(), snapshot.load_balancer.clone()));

        config.add_watcher(Arc::new(RegistrySync(registry.clone())));
        config.add_watcher(balancer.clone());
        config.add_watcher(router.clone());
        config.add_watcher(limiter.clone());
        config.add_watcher(monitor.clone());

        tracing::info!(
            services = snapshot.services.len(),
            strategy = %snapshot.load_balancer.strategy,
            health_check = snapshot.load_balancer.health_check,
            "Gateway initialized"
        );

        let state = AppState::new(config, registry, balancer, router, limiter, validator);
        Self { state, monitor }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.state.registry
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    /// The complete HTTP application, for serving or in-process requests.
    pub fn app(&self) -> axum::Router {
        HttpServer::build_router(self.state.clone(), self.state.config.config().timeout)
    }

    /// Run the health monitor and the HTTP server until `shutdown` fires,
    /// then close the registry.
    pub async fn serve(self, listener: TcpListener, shutdown: &Shutdown) -> std::io::Result<()> {
        let monitor = tokio::spawn(self.monitor.clone().run(shutdown.subscribe()));

        let server = HttpServer::new(self.state.clone(), self.state.config.config().timeout);
        let result = server.run(listener, shutdown.subscribe()).await;

        self.state.registry.close();
        if let Err(e) = monitor.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }
        result
    }
}
