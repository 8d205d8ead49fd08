//! API gateway: service registry with health checking, pluggable load
//! balancing, hot-reloadable configuration and a reverse-proxy router.

pub mod admin;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod registry;
pub mod routing;
pub mod security;

pub use config::{ConfigManager, GatewayConfig};
pub use http::HttpServer;
pub use lifecycle::{Gateway, Shutdown};
pub use load_balancer::{LoadBalancer, Strategy};
pub use registry::{ServiceInstance, ServiceRegistry};
