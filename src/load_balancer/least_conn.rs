//! Least Connections load balancing strategy.

use crate::load_balancer::Selector;
use crate::registry::instance::ServiceInstance;

/// Least connections selector.
/// Selects the instance with the minimum number of in-flight connections.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for LeastConnections {
    fn select(&self, candidates: &[&ServiceInstance], _cursor: &mut usize) -> usize {
        // In case of tie, the first one is selected (stability)
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(_, inst)| inst.connections)
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}
