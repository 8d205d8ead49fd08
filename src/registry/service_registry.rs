//! Authoritative instance set per service name.
//!
//! # Responsibilities
//! - Register / unregister / discover instances
//! - Own per-instance load counters and per-service round-robin cursors
//! - Apply health probe outcomes
//! - Publish versioned snapshots to watchers on membership or health changes
//!
//! # Design Decisions
//! - One lock for instances, counters and cursors: selection and accounting
//!   happen in the same critical section as the health filter
//! - The lock is never held across an `.await`
//! - Load counter changes do not publish snapshots

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::manager::{ConfigWatcher, WatcherResult};
use crate::config::schema::GatewayConfig;
use crate::config::validation::is_http_url;
use crate::error::{BalancerError, RegistryError};
use crate::health::state::{self as health_state, ProbeOutcome, Transition};
use crate::load_balancer::Selector;
use crate::registry::instance::{config_instance_id, InstanceSource, ServiceInstance};

/// Point-in-time instance list of one service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceSnapshot {
    /// Increases by one on every published change.
    pub version: u64,
    pub instances: Vec<ServiceInstance>,
}

/// Stream of snapshots returned by [`ServiceRegistry::watch`].
pub type SnapshotStream = BoxStream<'static, ServiceSnapshot>;

/// Health probe work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub service: String,
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    pub total_instances: usize,
    pub healthy_instances: usize,
    pub unhealthy_instances: usize,
    pub total_connections: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub total_services: usize,
    pub total_instances: usize,
    pub healthy_instances: usize,
    pub unhealthy_instances: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub services: BTreeMap<String, ServiceStats>,
    pub summary: RegistrySummary,
}

#[derive(Debug, Default)]
struct ServiceEntry {
    instances: Vec<ServiceInstance>,
    cursor: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    services: HashMap<String, ServiceEntry>,
    watchers: HashMap<String, watch::Sender<ServiceSnapshot>>,
}

impl RegistryState {
    fn publish(&mut self, service: &str) {
        let Some(tx) = self.watchers.get(service) else {
            return;
        };
        if tx.is_closed() {
            self.watchers.remove(service);
            return;
        }
        let instances = self
            .services
            .get(service)
            .map(|e| e.instances.clone())
            .unwrap_or_default();
        tx.send_modify(|snapshot| {
            snapshot.version += 1;
            snapshot.instances = instances;
        });
    }
}

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    state: RwLock<RegistryState>,
    closed: CancellationToken,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an instance by `(service_name, id)`.
    ///
    /// New instances start healthy with zero connections. For an existing id
    /// the identity and placement fields are overwritten while liveness and
    /// load state are kept.
    pub fn register(&self, instance: ServiceInstance) -> Result<ServiceInstance, RegistryError> {
        if instance.service_name.trim().is_empty() {
            return Err(RegistryError::InvalidInstance("service name cannot be empty".into()));
        }
        if instance.id.trim().is_empty() {
            return Err(RegistryError::InvalidInstance("instance id cannot be empty".into()));
        }
        if !is_http_url(&instance.url) {
            return Err(RegistryError::InvalidInstance(format!("invalid url {:?}", instance.url)));
        }

        let mut state = self.state.write();
        let name = instance.service_name.clone();
        let entry = state.services.entry(name.clone()).or_default();

        let (registered, changed) = match entry.instances.iter_mut().find(|i| i.id == instance.id) {
            Some(existing) => {
                let changed = existing.url != instance.url
                    || existing.weight != instance.weight
                    || existing.health_check_path != instance.health_check_path
                    || existing.source != instance.source;
                if changed {
                    existing.url = instance.url;
                    existing.weight = instance.weight;
                    existing.health_check_path = instance.health_check_path;
                    existing.source = instance.source;
                    tracing::debug!(service = %name, id = %existing.id, "Service instance updated");
                }
                (existing.clone(), changed)
            }
            None => {
                let now = Utc::now();
                let mut fresh = instance;
                fresh.register_time = now;
                fresh.last_check = now;
                fresh.healthy = true;
                fresh.connections = 0;
                fresh.failure_count = 0;
                tracing::info!(service = %name, id = %fresh.id, url = %fresh.url, "Service registered");
                entry.instances.push(fresh.clone());
                (fresh, true)
            }
        };

        if changed {
            state.publish(&name);
        }
        Ok(registered)
    }

    /// Remove one instance. The service entry disappears with its last instance.
    pub fn unregister(&self, service: &str, id: &str) -> Result<ServiceInstance, RegistryError> {
        let mut state = self.state.write();
        let entry = state
            .services
            .get_mut(service)
            .ok_or_else(|| RegistryError::ServiceNotFound(service.to_string()))?;
        let position = entry
            .instances
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| RegistryError::InstanceNotFound {
                service: service.to_string(),
                id: id.to_string(),
            })?;

        let removed = entry.instances.remove(position);
        if entry.instances.is_empty() {
            state.services.remove(service);
        }
        state.publish(service);
        tracing::info!(service = %service, id = %id, "Service unregistered");
        Ok(removed)
    }

    /// Remove every instance of a service.
    pub fn unregister_service(&self, service: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        let mut state = self.state.write();
        let entry = state
            .services
            .remove(service)
            .ok_or_else(|| RegistryError::ServiceNotFound(service.to_string()))?;
        state.publish(service);
        tracing::info!(service = %service, instances = entry.instances.len(), "Service removed");
        Ok(entry.instances)
    }

    /// Healthy instances of a service.
    pub fn discover(&self, service: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        let state = self.state.read();
        let entry = state
            .services
            .get(service)
            .ok_or_else(|| RegistryError::ServiceNotFound(service.to_string()))?;
        let healthy: Vec<_> = entry.instances.iter().filter(|i| i.healthy).cloned().collect();
        if healthy.is_empty() {
            return Err(RegistryError::NoHealthyInstances(service.to_string()));
        }
        Ok(healthy)
    }

    /// Subscribe to a service's instance list.
    ///
    /// Yields the current list immediately, then a new snapshot after every
    /// registration, unregistration or health flip. Intermediate snapshots
    /// may coalesce; the latest one is always delivered. The stream ends when
    /// `cancel` fires or the registry is closed.
    pub fn watch(&self, service: &str, cancel: CancellationToken) -> SnapshotStream {
        let rx = {
            let mut state = self.state.write();
            let current = state
                .services
                .get(service)
                .map(|e| e.instances.clone())
                .unwrap_or_default();
            state
                .watchers
                .entry(service.to_string())
                .or_insert_with(|| {
                    watch::channel(ServiceSnapshot {
                        version: 0,
                        instances: current,
                    })
                    .0
                })
                .subscribe()
        };
        let closed = self.closed.clone();

        stream::unfold((rx, cancel, closed, true), |(mut rx, cancel, closed, first)| async move {
            if first {
                let snapshot = rx.borrow_and_update().clone();
                return Some((snapshot, (rx, cancel, closed, false)));
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                _ = closed.cancelled() => None,
                changed = rx.changed() => match changed {
                    Ok(()) => {
                        let snapshot = rx.borrow_and_update().clone();
                        Some((snapshot, (rx, cancel, closed, false)))
                    }
                    Err(_) => None,
                },
            }
        })
        .boxed()
    }

    /// Pick a healthy instance with `selector` and count a connection on it,
    /// atomically with respect to every other registry operation.
    pub fn select(&self, service: &str, selector: &dyn Selector) -> Result<ServiceInstance, BalancerError> {
        let mut state = self.state.write();
        let entry = match state.services.get_mut(service) {
            Some(entry) if !entry.instances.is_empty() => entry,
            _ => return Err(BalancerError::NoAvailableInstances(service.to_string())),
        };
        let ServiceEntry { instances, cursor } = entry;

        let healthy: Vec<usize> = instances
            .iter()
            .enumerate()
            .filter(|(_, i)| i.healthy)
            .map(|(index, _)| index)
            .collect();
        if healthy.is_empty() {
            return Err(BalancerError::NoHealthyInstances(service.to_string()));
        }

        let candidates: Vec<&ServiceInstance> = healthy.iter().map(|&index| &instances[index]).collect();
        let picked = selector.select(&candidates, cursor);
        let chosen = &mut instances[healthy[picked.min(healthy.len() - 1)]];
        chosen.connections += 1;
        Ok(chosen.clone())
    }

    /// Give back a connection counted by [`select`](Self::select).
    /// Floors at zero; returns `false` if the instance is gone.
    pub fn release(&self, service: &str, id: &str) -> bool {
        let mut state = self.state.write();
        match state
            .services
            .get_mut(service)
            .and_then(|e| e.instances.iter_mut().find(|i| i.id == id))
        {
            Some(inst) => {
                inst.connections = inst.connections.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    /// Fold a probe outcome into an instance; publishes only on a flip.
    pub fn record_probe(&self, service: &str, id: &str, outcome: &ProbeOutcome) -> Option<Transition> {
        let mut state = self.state.write();
        let inst = state
            .services
            .get_mut(service)
            .and_then(|e| e.instances.iter_mut().find(|i| i.id == id))?;

        let transition = health_state::apply(inst, outcome, Utc::now());
        match (transition, outcome) {
            (Transition::BecameUnhealthy, ProbeOutcome::Failure { reason, .. }) => {
                tracing::warn!(service = %service, id = %id, reason = %reason, "Instance marked unhealthy");
            }
            (Transition::BecameHealthy, _) => {
                tracing::info!(service = %service, id = %id, "Instance marked healthy");
            }
            _ => {}
        }
        if transition.flipped() {
            state.publish(service);
        }
        Some(transition)
    }

    /// Overwrite the health flag directly. Returns whether it flipped.
    pub fn set_healthy(&self, service: &str, id: &str, healthy: bool) -> Result<bool, RegistryError> {
        let mut state = self.state.write();
        let inst = state
            .services
            .get_mut(service)
            .ok_or_else(|| RegistryError::ServiceNotFound(service.to_string()))?
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| RegistryError::InstanceNotFound {
                service: service.to_string(),
                id: id.to_string(),
            })?;

        let flipped = inst.healthy != healthy;
        inst.healthy = healthy;
        if flipped {
            state.publish(service);
        }
        Ok(flipped)
    }

    /// Every instance to probe on the next health tick.
    pub fn probe_targets(&self) -> Vec<ProbeTarget> {
        let state = self.state.read();
        state
            .services
            .iter()
            .flat_map(|(name, entry)| {
                entry.instances.iter().map(move |i| ProbeTarget {
                    service: name.clone(),
                    id: i.id.clone(),
                    url: i.health_url(),
                })
            })
            .collect()
    }

    pub fn instances(&self, service: &str) -> Option<Vec<ServiceInstance>> {
        self.state.read().services.get(service).map(|e| e.instances.clone())
    }

    pub fn services(&self) -> BTreeMap<String, Vec<ServiceInstance>> {
        self.state
            .read()
            .services
            .iter()
            .map(|(name, entry)| (name.clone(), entry.instances.clone()))
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.state.read();
        let mut stats = RegistryStats::default();
        for (name, entry) in &state.services {
            let healthy = entry.instances.iter().filter(|i| i.healthy).count();
            let service = ServiceStats {
                total_instances: entry.instances.len(),
                healthy_instances: healthy,
                unhealthy_instances: entry.instances.len() - healthy,
                total_connections: entry.instances.iter().map(|i| i.connections).sum(),
            };
            stats.summary.total_services += 1;
            stats.summary.total_instances += service.total_instances;
            stats.summary.healthy_instances += service.healthy_instances;
            stats.summary.unhealthy_instances += service.unhealthy_instances;
            stats.services.insert(name.clone(), service);
        }
        stats
    }

    /// Bring config-sourced instances in line with `config.services`.
    /// Dynamically registered instances are left alone.
    pub fn reconcile(&self, config: &GatewayConfig) {
        for (name, service) in &config.services {
            let instance = ServiceInstance::new(name, config_instance_id(name), &service.url)
                .with_weight(u32::try_from(service.weight).unwrap_or(0))
                .with_health_check_path(&service.health_check_path)
                .with_source(InstanceSource::Config);
            if let Err(e) = self.register(instance) {
                tracing::warn!(service = %name, error = %e, "Skipping configured service");
            }
        }

        let stale: Vec<(String, String)> = {
            let state = self.state.read();
            state
                .services
                .iter()
                .filter(|(name, _)| !config.services.contains_key(*name))
                .flat_map(|(name, entry)| {
                    entry
                        .instances
                        .iter()
                        .filter(|i| i.source == InstanceSource::Config)
                        .map(move |i| (name.clone(), i.id.clone()))
                })
                .collect()
        };
        for (service, id) in stale {
            let _ = self.unregister(&service, &id);
        }
    }

    /// Stop the health monitor and end every watch stream.
    pub fn close(&self) {
        self.closed.cancel();
        self.state.write().watchers.clear();
        tracing::info!("Service registry closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}

/// Keeps config-sourced instances in sync with reloads.
#[derive(Debug, Clone)]
pub struct RegistrySync(pub Arc<ServiceRegistry>);

#[async_trait]
impl ConfigWatcher for RegistrySync {
    fn name(&self) -> &str {
        "service-registry"
    }

    async fn on_config_changed(&self, config: Arc<GatewayConfig>) -> WatcherResult {
        self.0.reconcile(&config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceConfig;
    use crate::load_balancer::round_robin::RoundRobin;
    use std::time::Duration;

    fn inst(service: &str, id: &str) -> ServiceInstance {
        ServiceInstance::new(service, id, format!("http://{}.{}.local:8000", id, service))
    }

    fn failure() -> ProbeOutcome {
        ProbeOutcome::Failure {
            response_time: Duration::from_millis(1),
            reason: "connection refused".into(),
        }
    }

    fn success() -> ProbeOutcome {
        ProbeOutcome::Success { response_time: Duration::from_millis(1) }
    }

    #[test]
    fn test_register_starts_healthy_and_idle() {
        let registry = ServiceRegistry::new();
        let mut candidate = inst("svc", "a");
        candidate.healthy = false;
        candidate.connections = 7;

        let registered = registry.register(candidate).unwrap();
        assert!(registered.healthy);
        assert_eq!(registered.connections, 0);
        assert_eq!(registered.last_check, registered.register_time);
    }

    #[test]
    fn test_register_existing_id_overwrites_and_keeps_load() {
        let registry = ServiceRegistry::new();
        registry.register(inst("svc", "a")).unwrap();
        registry.select("svc", &RoundRobin::new()).unwrap();

        let updated = registry
            .register(ServiceInstance::new("svc", "a", "http://new:9000").with_weight(4))
            .unwrap();
        assert_eq!(updated.url, "http://new:9000");
        assert_eq!(updated.weight, 4);
        assert_eq!(updated.connections, 1);
        assert_eq!(registry.instances("svc").unwrap().len(), 1);
    }

    #[test]
    fn test_register_rejects_invalid() {
        let registry = ServiceRegistry::new();
        assert!(matches!(
            registry.register(ServiceInstance::new("", "a", "http://h")),
            Err(RegistryError::InvalidInstance(_))
        ));
        assert!(matches!(
            registry.register(ServiceInstance::new("svc", "", "http://h")),
            Err(RegistryError::InvalidInstance(_))
        ));
        assert!(matches!(
            registry.register(ServiceInstance::new("svc", "a", "not a url")),
            Err(RegistryError::InvalidInstance(_))
        ));
        assert!(matches!(
            registry.register(ServiceInstance::new("svc", "a", "https://h")),
            Err(RegistryError::InvalidInstance(_))
        ));
        assert!(registry.instances("svc").is_none());
    }

    #[test]
    fn test_unregister_removes_empty_service() {
        let registry = ServiceRegistry::new();
        registry.register(inst("svc", "a")).unwrap();
        registry.register(inst("svc", "b")).unwrap();

        registry.unregister("svc", "a").unwrap();
        assert_eq!(registry.instances("svc").unwrap().len(), 1);
        registry.unregister("svc", "b").unwrap();
        assert!(registry.instances("svc").is_none());
        assert!(registry.services().is_empty());

        assert_eq!(
            registry.unregister("svc", "b"),
            Err(RegistryError::ServiceNotFound("svc".into()))
        );
    }

    #[test]
    fn test_unregister_missing_id() {
        let registry = ServiceRegistry::new();
        registry.register(inst("svc", "a")).unwrap();
        assert_eq!(
            registry.unregister("svc", "zzz"),
            Err(RegistryError::InstanceNotFound { service: "svc".into(), id: "zzz".into() })
        );
    }

    #[test]
    fn test_discover_error_kinds() {
        let registry = ServiceRegistry::new();
        assert_eq!(
            registry.discover("svc"),
            Err(RegistryError::ServiceNotFound("svc".into()))
        );

        registry.register(inst("svc", "a")).unwrap();
        registry.register(inst("svc", "b")).unwrap();
        registry.set_healthy("svc", "b", false).unwrap();
        let found = registry.discover("svc").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a");

        registry.set_healthy("svc", "a", false).unwrap();
        assert_eq!(
            registry.discover("svc"),
            Err(RegistryError::NoHealthyInstances("svc".into()))
        );
    }

    #[test]
    fn test_select_and_release_accounting() {
        let registry = ServiceRegistry::new();
        registry.register(inst("svc", "a")).unwrap();

        let chosen = registry.select("svc", &RoundRobin::new()).unwrap();
        assert_eq!(chosen.connections, 1);
        assert!(registry.release("svc", "a"));
        assert!(registry.release("svc", "a"));
        assert_eq!(registry.instances("svc").unwrap()[0].connections, 0);
        assert!(!registry.release("svc", "missing"));
    }

    #[test]
    fn test_record_probe_counts_failures() {
        let registry = ServiceRegistry::new();
        registry.register(inst("svc", "a")).unwrap();

        assert_eq!(registry.record_probe("svc", "a", &failure()), Some(Transition::BecameUnhealthy));
        assert_eq!(registry.record_probe("svc", "a", &failure()), Some(Transition::Unchanged));
        assert_eq!(registry.instances("svc").unwrap()[0].failure_count, 2);
        assert_eq!(registry.record_probe("svc", "a", &success()), Some(Transition::BecameHealthy));
        assert_eq!(registry.instances("svc").unwrap()[0].failure_count, 0);
        assert_eq!(registry.record_probe("svc", "gone", &success()), None);
    }

    #[test]
    fn test_stats() {
        let registry = ServiceRegistry::new();
        registry.register(inst("a", "1")).unwrap();
        registry.register(inst("a", "2")).unwrap();
        registry.register(inst("b", "1")).unwrap();
        registry.set_healthy("a", "2", false).unwrap();
        registry.select("a", &RoundRobin::new()).unwrap();

        let stats = registry.stats();
        assert_eq!(stats.summary.total_services, 2);
        assert_eq!(stats.summary.total_instances, 3);
        assert_eq!(stats.summary.unhealthy_instances, 1);
        assert_eq!(stats.services["a"].healthy_instances, 1);
        assert_eq!(stats.services["a"].total_connections, 1);
    }

    #[test]
    fn test_probe_targets() {
        let registry = ServiceRegistry::new();
        registry
            .register(ServiceInstance::new("svc", "a", "http://h:1").with_health_check_path("/ready"))
            .unwrap();
        assert_eq!(
            registry.probe_targets(),
            vec![ProbeTarget { service: "svc".into(), id: "a".into(), url: "http://h:1/ready".into() }]
        );
    }

    #[test]
    fn test_reconcile_keeps_dynamic_instances() {
        let registry = ServiceRegistry::new();
        let mut config = GatewayConfig::default();
        config.services.insert("users".into(), ServiceConfig::new("http://u:1"));
        config.services.insert("grades".into(), ServiceConfig::new("http://g:1"));
        registry.reconcile(&config);
        registry.register(inst("grades", "extra")).unwrap();

        config.services.remove("grades");
        config.services.get_mut("users").unwrap().url = "http://u:2".into();
        registry.reconcile(&config);

        let users = registry.instances("users").unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, "users-1");
        assert_eq!(users[0].url, "http://u:2");
        assert_eq!(users[0].source, InstanceSource::Config);

        let grades = registry.instances("grades").unwrap();
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0].id, "extra");
    }

    #[tokio::test]
    async fn test_watch_emits_on_flip_only_and_ends_on_cancel() {
        let registry = ServiceRegistry::new();
        registry.register(inst("svc", "a")).unwrap();
        let cancel = CancellationToken::new();
        let mut stream = registry.watch("svc", cancel.clone());

        let first = stream.next().await.unwrap();
        assert_eq!(first.instances.len(), 1);
        assert!(first.instances[0].healthy);

        // A successful probe on a healthy instance is not a change.
        registry.record_probe("svc", "a", &success());
        registry.select("svc", &RoundRobin::new()).unwrap();
        assert!(tokio::time::timeout(Duration::from_millis(50), stream.next()).await.is_err());

        registry.record_probe("svc", "a", &failure());
        let flipped = stream.next().await.unwrap();
        assert!(!flipped.instances[0].healthy);
        assert!(flipped.version > first.version);

        // Repeated failure: no flip, no snapshot.
        registry.record_probe("svc", "a", &failure());
        assert!(tokio::time::timeout(Duration::from_millis(50), stream.next()).await.is_err());

        cancel.cancel();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_watch_quiet_when_reconcile_changes_nothing() {
        let registry = ServiceRegistry::new();
        let mut config = GatewayConfig::default();
        config.services.insert("users".into(), ServiceConfig::new("http://u:1"));
        registry.reconcile(&config);

        let mut stream = registry.watch("users", CancellationToken::new());
        let first = stream.next().await.unwrap();

        registry.reconcile(&config);
        assert!(tokio::time::timeout(Duration::from_millis(50), stream.next()).await.is_err());

        config.services.get_mut("users").unwrap().weight = 3;
        registry.reconcile(&config);
        let updated = stream.next().await.unwrap();
        assert!(updated.version > first.version);
        assert_eq!(updated.instances[0].weight, 3);
    }

    #[tokio::test]
    async fn test_watch_unknown_service_sees_registration() {
        let registry = ServiceRegistry::new();
        let mut stream = registry.watch("later", CancellationToken::new());
        assert!(stream.next().await.unwrap().instances.is_empty());

        registry.register(inst("later", "a")).unwrap();
        let snapshot = stream.next().await.unwrap();
        assert_eq!(snapshot.instances.len(), 1);

        registry.unregister("later", "a").unwrap();
        assert!(stream.next().await.unwrap().instances.is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_watch_streams() {
        let registry = ServiceRegistry::new();
        let mut stream = registry.watch("svc", CancellationToken::new());
        stream.next().await.unwrap();
        registry.close();
        assert!(stream.next().await.is_none());
        assert!(registry.is_closed());
    }
}
