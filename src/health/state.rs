//! Instance health state machine.
//!
//! # States
//! - Healthy: instance receives traffic
//! - Unhealthy: instance excluded from load balancing
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: any failed probe
//! Unhealthy → Healthy: one successful probe (HTTP 200)
//! ```
//!
//! Every instance starts Healthy on registration. There is no terminal state.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::registry::instance::ServiceInstance;

/// Result of one health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success { response_time: Duration },
    Failure { response_time: Duration, reason: String },
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success { .. })
    }

    fn response_time(&self) -> Duration {
        match self {
            ProbeOutcome::Success { response_time } | ProbeOutcome::Failure { response_time, .. } => {
                *response_time
            }
        }
    }
}

/// Effect of a probe on the `healthy` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    BecameHealthy,
    BecameUnhealthy,
}

impl Transition {
    pub fn flipped(self) -> bool {
        self != Transition::Unchanged
    }
}

/// Fold a probe outcome into an instance's liveness fields.
pub fn apply(instance: &mut ServiceInstance, outcome: &ProbeOutcome, now: DateTime<Utc>) -> Transition {
    let was_healthy = instance.healthy;
    instance.last_check = now;
    instance.response_time = outcome.response_time();

    if outcome.is_success() {
        instance.healthy = true;
        instance.failure_count = 0;
    } else {
        instance.healthy = false;
        instance.failure_count = instance.failure_count.saturating_add(1);
    }

    match (was_healthy, instance.healthy) {
        (false, true) => Transition::BecameHealthy,
        (true, false) => Transition::BecameUnhealthy,
        _ => Transition::Unchanged,
    }
}
