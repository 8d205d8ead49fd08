//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered instance
//! - Feed probe outcomes into the registry
//! - Follow interval/timeout/concurrency changes from config reloads

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::stream::{self, StreamExt};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::manager::{ConfigWatcher, WatcherResult};
use crate::config::schema::{GatewayConfig, LoadBalancerConfig};
use crate::health::state::ProbeOutcome;
use crate::observability::metrics;
use crate::registry::{ProbeTarget, ServiceRegistry};

pub struct HealthMonitor {
    registry: Arc<ServiceRegistry>,
    settings: ArcSwap<LoadBalancerConfig>,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<ServiceRegistry>, settings: LoadBalancerConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            registry,
            settings: ArcSwap::from_pointee(settings),
            client,
        }
    }

    /// Probe loop. Ends on the shutdown signal or when the registry is closed;
    /// a tick in progress is abandoned.
    ///
    /// The interval is re-read before every sleep so reloads take effect on
    /// the next tick. With health checking disabled the loop keeps ticking
    /// without probing.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let initial = self.settings.load_full();
        tracing::info!(
            enabled = initial.health_check,
            interval_ms = initial.check_interval.as_millis() as u64,
            "Health monitor starting"
        );

        loop {
            let interval = self.settings.load().check_interval;
            let tick = async {
                time::sleep(interval).await;
                if self.settings.load().health_check {
                    self.check_all().await;
                }
            };

            tokio::select! {
                _ = tick => {}
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
                _ = self.registry.closed() => {
                    tracing::info!("Registry closed, health monitor exiting");
                    break;
                }
            }
        }
    }

    /// Probe every instance once, with at most `max_concurrent_checks` in flight.
    pub async fn check_all(&self) {
        let settings = self.settings.load_full();
        let targets = self.registry.probe_targets();
        tracing::debug!(targets = targets.len(), "Running health checks");

        stream::iter(targets)
            .for_each_concurrent(settings.max_concurrent_checks.max(1), |target| {
                let settings = settings.clone();
                async move {
                    let outcome = self.probe(&target, &settings).await;
                    let success = outcome.is_success();
                    if let ProbeOutcome::Failure { reason, .. } = &outcome {
                        tracing::debug!(service = %target.service, id = %target.id, reason = %reason, "Health check failed");
                    }

                    // The instance may have been unregistered mid-probe.
                    if self.registry.record_probe(&target.service, &target.id, &outcome).is_some() {
                        metrics::record_health_check(&target.service, success);
                        metrics::record_instance_health(&target.service, &target.id, success);
                    }
                }
            })
            .await;
    }

    async fn probe(&self, target: &ProbeTarget, settings: &LoadBalancerConfig) -> ProbeOutcome {
        let start = Instant::now();
        let request = match Request::builder()
            .method("GET")
            .uri(&target.url)
            .header("user-agent", "service-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                return ProbeOutcome::Failure {
                    response_time: start.elapsed(),
                    reason: format!("invalid health check url: {}", e),
                }
            }
        };

        let result = time::timeout(settings.check_timeout, self.client.request(request)).await;
        let response_time = start.elapsed();
        match result {
            Ok(Ok(response)) if response.status() == StatusCode::OK => ProbeOutcome::Success { response_time },
            Ok(Ok(response)) => ProbeOutcome::Failure {
                response_time,
                reason: format!("status {}", response.status()),
            },
            Ok(Err(e)) => ProbeOutcome::Failure {
                response_time,
                reason: format!("connection error: {}", e),
            },
            Err(_) => ProbeOutcome::Failure {
                response_time,
                reason: "timeout".to_string(),
            },
        }
    }
}

#[async_trait]
impl ConfigWatcher for HealthMonitor {
    fn name(&self) -> &str {
        "health-monitor"
    }

    async fn on_config_changed(&self, config: Arc<GatewayConfig>) -> WatcherResult {
        self.settings.store(Arc::new(config.load_balancer.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceInstance;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers every connection with `status_line` and an empty body.
    async fn stub_backend(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_line);
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    fn settings() -> LoadBalancerConfig {
        LoadBalancerConfig {
            check_interval: Duration::from_millis(20),
            check_timeout: Duration::from_millis(500),
            ..LoadBalancerConfig::default()
        }
    }

    fn healthy(registry: &ServiceRegistry, id: &str) -> bool {
        registry
            .instances("svc")
            .unwrap()
            .into_iter()
            .find(|i| i.id == id)
            .unwrap()
            .healthy
    }

    #[tokio::test]
    async fn test_only_200_is_healthy() {
        let registry = Arc::new(ServiceRegistry::new());
        registry.register(ServiceInstance::new("svc", "ok", stub_backend("200 OK").await)).unwrap();
        registry
            .register(ServiceInstance::new("svc", "nocontent", stub_backend("204 No Content").await))
            .unwrap();
        registry
            .register(ServiceInstance::new("svc", "down", "http://127.0.0.1:1"))
            .unwrap();

        let monitor = HealthMonitor::new(registry.clone(), settings());
        monitor.check_all().await;

        assert!(healthy(&registry, "ok"));
        assert!(!healthy(&registry, "nocontent"));
        assert!(!healthy(&registry, "down"));
    }

    #[tokio::test]
    async fn test_run_stops_when_registry_closes() {
        let registry = Arc::new(ServiceRegistry::new());
        let monitor = Arc::new(HealthMonitor::new(registry.clone(), settings()));
        let (_tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(monitor.run(rx));
        registry.close();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_run_probes_periodically_and_stops_on_shutdown() {
        let registry = Arc::new(ServiceRegistry::new());
        registry
            .register(ServiceInstance::new("svc", "down", "http://127.0.0.1:1"))
            .unwrap();
        let monitor = Arc::new(HealthMonitor::new(registry.clone(), settings()));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(monitor.run(rx));

        time::sleep(Duration::from_millis(300)).await;
        assert!(!healthy(&registry, "down"));

        tx.send(()).unwrap();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_abandons_tick_in_progress() {
        // Accepts and never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let registry = Arc::new(ServiceRegistry::new());
        registry
            .register(ServiceInstance::new("svc", "slow", format!("http://{}", addr)))
            .unwrap();
        let monitor = Arc::new(HealthMonitor::new(
            registry.clone(),
            LoadBalancerConfig {
                check_timeout: Duration::from_secs(30),
                ..settings()
            },
        ));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(monitor.run(rx));

        time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();
        time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert!(healthy(&registry, "slow"));
    }

    #[tokio::test]
    async fn test_disabled_checks_leave_health_alone() {
        let registry = Arc::new(ServiceRegistry::new());
        registry
            .register(ServiceInstance::new("svc", "down", "http://127.0.0.1:1"))
            .unwrap();
        let monitor = Arc::new(HealthMonitor::new(
            registry.clone(),
            LoadBalancerConfig { health_check: false, ..settings() },
        ));
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(monitor.run(rx));

        time::sleep(Duration::from_millis(150)).await;
        assert!(healthy(&registry, "down"));
        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
