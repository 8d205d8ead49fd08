//! Round-robin load balancing strategy.

use crate::load_balancer::Selector;
use crate::registry::instance::ServiceInstance;

/// Round-robin selector.
///
/// The cursor indexes the healthy list as recomputed on every call, so the
/// cyclic order can shift when an instance changes health.
#[derive(Debug, Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for RoundRobin {
    fn select(&self, candidates: &[&ServiceInstance], cursor: &mut usize) -> usize {
        let index = *cursor % candidates.len();
        *cursor = cursor.wrapping_add(1);
        index
    }
}
