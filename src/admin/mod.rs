pub mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;

/// Method and path of every management endpoint, as listed by `/gateway/routes`.
pub const MANAGEMENT_ROUTES: [(&str, &str); 6] = [
    ("GET", "/health"),
    ("GET", "/gateway/stats"),
    ("GET", "/gateway/services"),
    ("GET", "/gateway/routes"),
    ("POST", "/gateway/services/{name}/register"),
    ("DELETE", "/gateway/services/{name}/unregister"),
];

pub fn management_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/gateway/stats", get(stats))
        .route("/gateway/services", get(services))
        .route("/gateway/routes", get(routes))
        .route("/gateway/services/{name}/register", post(register))
        .route("/gateway/services/{name}/unregister", delete(unregister))
}
