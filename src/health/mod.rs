//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each registered instance (bounded concurrency)
//!     → registry.record_probe
//!     → state.rs decides the transition
//!     → Watchers notified on flips only
//! ```
//!
//! # Design Decisions
//! - One failed probe marks an instance unhealthy; one success restores it
//! - Only HTTP 200 counts as a successful probe
//! - Health state is per-instance, not per-service

pub mod active;
pub mod state;

pub use active::HealthMonitor;
