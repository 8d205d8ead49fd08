//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! config file ──reconcile──┐
//! management API ──register┼──→ ServiceRegistry ──watch──→ snapshot streams
//! health monitor ──probe───┘         │
//!                                    └──select/release──→ LoadBalancer
//! ```

pub mod instance;
pub mod service_registry;

pub use instance::{InstanceSource, ServiceInstance};
pub use service_registry::{
    ProbeTarget, RegistryStats, RegistrySync, ServiceRegistry, ServiceSnapshot, SnapshotStream,
};
