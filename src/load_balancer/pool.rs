//! Strategy façade over the registry.
//!
//! # Responsibilities
//! - Hold the active selection strategy
//! - Select an instance per request and count the connection on it
//! - Hand out guards that give the connection back on drop

use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;

use crate::config::manager::{ConfigWatcher, WatcherResult};
use crate::config::schema::GatewayConfig;
use crate::error::BalancerError;
use crate::load_balancer::{Selector, Strategy};
use crate::registry::{ServiceInstance, ServiceRegistry};

#[derive(Debug)]
struct ActiveStrategy {
    strategy: Strategy,
    selector: Box<dyn Selector>,
}

impl ActiveStrategy {
    fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            selector: strategy.selector(),
        }
    }
}

#[derive(Debug)]
pub struct LoadBalancer {
    registry: Arc<ServiceRegistry>,
    active: ArcSwap<ActiveStrategy>,
}

impl LoadBalancer {
    pub fn new(registry: Arc<ServiceRegistry>, strategy: Strategy) -> Self {
        Self {
            registry,
            active: ArcSwap::from_pointee(ActiveStrategy::new(strategy)),
        }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn strategy(&self) -> Strategy {
        self.active.load().strategy
    }

    pub fn set_strategy(&self, strategy: Strategy) {
        if self.strategy() == strategy {
            return;
        }
        self.active.store(Arc::new(ActiveStrategy::new(strategy)));
        tracing::info!(strategy = %strategy, "Load balancing strategy changed");
    }

    /// Choose a healthy instance of `service` and count one connection on it.
    ///
    /// Every successful call must be paired with
    /// [`release_connection`](Self::release_connection).
    pub fn get_instance(&self, service: &str) -> Result<ServiceInstance, BalancerError> {
        let active = self.active.load();
        let chosen = self.registry.select(service, active.selector.as_ref())?;
        tracing::debug!(
            service = %service,
            id = %chosen.id,
            strategy = %active.strategy,
            connections = chosen.connections,
            "Instance selected"
        );
        Ok(chosen)
    }

    /// Give back a connection taken by [`get_instance`](Self::get_instance).
    /// Safe to call after the instance was unregistered.
    pub fn release_connection(&self, instance: &ServiceInstance) {
        self.registry.release(&instance.service_name, &instance.id);
    }

    /// [`get_instance`](Self::get_instance) wrapped in a guard that releases on drop.
    pub fn acquire(&self, service: &str) -> Result<ConnectionGuard, BalancerError> {
        let instance = self.get_instance(service)?;
        Ok(ConnectionGuard {
            registry: self.registry.clone(),
            instance,
        })
    }
}

#[async_trait]
impl ConfigWatcher for LoadBalancer {
    fn name(&self) -> &str {
        "load-balancer"
    }

    async fn on_config_changed(&self, config: Arc<GatewayConfig>) -> WatcherResult {
        self.set_strategy(config.load_balancer.strategy);
        Ok(())
    }
}

/// A RAII guard that manages an instance's connection count.
#[derive(Debug)]
pub struct ConnectionGuard {
    registry: Arc<ServiceRegistry>,
    instance: ServiceInstance,
}

impl Deref for ConnectionGuard {
    type Target = ServiceInstance;
    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.release(&self.instance.service_name, &self.instance.id);
    }
}
