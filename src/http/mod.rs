//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (reuse or assign X-Request-ID)
//!     → management handlers, or
//!     → proxy.rs (route → balancer → upstream)
//!     → response.rs (envelope, gateway headers)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use response::ApiResponse;
pub use server::{AppState, HttpServer};
