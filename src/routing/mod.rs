//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup in the current table)
//!     → matcher.rs (segment-aware prefix match)
//!     → Return: matched Route or None (404)
//!
//! Route Compilation (startup and every config reload):
//!     services.*.prefix
//!     → Sort by prefix length
//!     → Freeze as immutable RouteTable, swapped in atomically
//! ```
//!
//! # Design Decisions
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Longest prefix wins

pub mod matcher;
pub mod router;

pub use router::{Route, RouteInfo, RouteTable, Router};
