//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (check per-IP limits)
//!     → auth.rs (bearer check on protected routes)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → Pass to upstream
//!
//! Outgoing response:
//!     → security response headers (tower-http layers in http::server)
//!     → cors.rs (allow-listed origins, preflights answered in place)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in client input

pub mod auth;
pub mod cors;
pub mod headers;
pub mod rate_limit;

pub use auth::{MinLengthValidator, TokenValidator};
pub use rate_limit::RateLimiter;
