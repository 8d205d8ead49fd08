//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → service name identified
//!     → pool.rs (LoadBalancer::acquire)
//!     → registry: filter healthy instances of the service
//!     → Apply selection strategy:
//!         - round_robin.rs (rotate through healthy instances)
//!         - random.rs (uniform pick)
//!         - weighted.rs (weight-proportional pick)
//!         - least_conn.rs (pick instance with fewest connections)
//!     → connection counter incremented under the same lock
//!     → ConnectionGuard released when the exchange completes
//! ```
//!
//! # Design Decisions
//! - Selectors are stateless; the per-service cursor lives in the registry
//! - Strategy is global and follows config reloads
//! - Unhealthy instances excluded from selection

pub mod least_conn;
pub mod pool;
pub mod random;
pub mod round_robin;
pub mod weighted;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::registry::instance::ServiceInstance;

pub use pool::{ConnectionGuard, LoadBalancer};

/// Picks one instance from a non-empty list of healthy candidates.
pub trait Selector: Send + Sync + fmt::Debug {
    /// Returns an index into `candidates`. `cursor` is the per-service
    /// round-robin position, owned by the registry.
    fn select(&self, candidates: &[&ServiceInstance], cursor: &mut usize) -> usize;
}

/// Configured selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    Random,
    Weighted,
    LeastConn,
}

impl Strategy {
    pub fn selector(self) -> Box<dyn Selector> {
        match self {
            Strategy::RoundRobin => Box::new(round_robin::RoundRobin::new()),
            Strategy::Random => Box::new(random::RandomSelect::new()),
            Strategy::Weighted => Box::new(weighted::Weighted::new()),
            Strategy::LeastConn => Box::new(least_conn::LeastConnections::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::RoundRobin => "round_robin",
            Strategy::Random => "random",
            Strategy::Weighted => "weighted",
            Strategy::LeastConn => "least_conn",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
