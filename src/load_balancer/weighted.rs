//! Weighted random load balancing strategy.

use rand::Rng;

use crate::load_balancer::Selector;
use crate::registry::instance::ServiceInstance;

/// Picks each instance with probability `weight / total_weight`.
/// Falls back to a uniform pick when every weight is zero.
#[derive(Debug, Default)]
pub struct Weighted;

impl Weighted {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for Weighted {
    fn select(&self, candidates: &[&ServiceInstance], _cursor: &mut usize) -> usize {
        let mut rng = rand::thread_rng();
        let total: u64 = candidates.iter().map(|i| u64::from(i.weight)).sum();
        if total == 0 {
            return rng.gen_range(0..candidates.len());
        }

        let draw = rng.gen_range(0..total);
        let mut cumulative = 0u64;
        for (index, inst) in candidates.iter().enumerate() {
            cumulative += u64::from(inst.weight);
            if draw < cumulative {
                return index;
            }
        }
        candidates.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_support::instance;

    #[test]
    fn test_weight_ratio() {
        let sel = Weighted::new();
        let a = instance("a", 1, 0);
        let b = instance("b", 3, 0);
        let trials = 10_000;
        let mut a_hits = 0;
        for _ in 0..trials {
            if sel.select(&[&a, &b], &mut 0) == 0 {
                a_hits += 1;
            }
        }
        let ratio = a_hits as f64 / trials as f64;
        assert!((0.22..0.28).contains(&ratio), "a ratio {}", ratio);
    }

    #[test]
    fn test_zero_weight_never_picked_when_others_positive() {
        let sel = Weighted::new();
        let a = instance("a", 0, 0);
        let b = instance("b", 5, 0);
        for _ in 0..500 {
            assert_eq!(sel.select(&[&a, &b], &mut 0), 1);
        }
    }

    #[test]
    fn test_all_zero_weights_degrade_to_uniform() {
        let sel = Weighted::new();
        let a = instance("a", 0, 0);
        let b = instance("b", 0, 0);
        let mut seen = [false; 2];
        for _ in 0..500 {
            seen[sel.select(&[&a, &b], &mut 0)] = true;
        }
        assert_eq!(seen, [true, true]);
    }
}
