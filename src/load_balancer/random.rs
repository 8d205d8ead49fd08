//! Uniform random load balancing strategy.

use rand::Rng;

use crate::load_balancer::Selector;
use crate::registry::instance::ServiceInstance;

#[derive(Debug, Default)]
pub struct RandomSelect;

impl RandomSelect {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for RandomSelect {
    fn select(&self, candidates: &[&ServiceInstance], _cursor: &mut usize) -> usize {
        rand::thread_rng().gen_range(0..candidates.len())
    }
}
