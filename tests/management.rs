mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use service_gateway::{ConfigManager, Gateway};
use tempfile::TempDir;
use tower::ServiceExt;

use common::config_with;

struct Harness {
    gateway: Gateway,
    _dir: TempDir,
}

fn harness(services: &str) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.yaml");
    std::fs::write(&path, config_with(services)).unwrap();
    let manager = Arc::new(ConfigManager::new(&path).unwrap());
    Harness {
        gateway: Gateway::build(manager),
        _dir: dir,
    }
}

async fn call(gateway: &Gateway, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let res = gateway.app().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

const USERS: &str = "  users:\n    url: http://127.0.0.1:9001\n    weight: 3\n  orders:\n    url: http://127.0.0.1:9002\n    prefix: /api/orders\n    auth: true\n";

#[tokio::test]
async fn test_health_reports_services() {
    let h = harness(USERS);
    let (status, body) = call(&h.gateway, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], "2.0.0");
    assert!(body["timestamp"].as_i64().unwrap() > 0);
    assert_eq!(body["services"]["users"]["healthy"], true);
    assert_eq!(body["services"]["users"]["total_instances"], 1);
    assert_eq!(body["services"]["users"]["instances"][0]["id"], "users-1");
}

#[tokio::test]
async fn test_health_degraded_when_service_down() {
    let h = harness(USERS);
    h.gateway.registry().set_healthy("orders", "orders-1", false).unwrap();

    let (status, body) = call(&h.gateway, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["orders"]["healthy"], false);
    assert_eq!(body["services"]["users"]["healthy"], true);
}

#[tokio::test]
async fn test_stats() {
    let h = harness(USERS);
    let (status, body) = call(&h.gateway, Method::GET, "/gateway/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    let data = &body["data"];
    assert_eq!(data["gateway"]["version"], "2.0.0");
    assert_eq!(data["config"]["port"], 8080);
    assert_eq!(data["config"]["rate_limit"], 0);
    assert_eq!(data["config"]["timeout"], "5s");
    assert_eq!(data["load_balancer"]["strategy"], "round_robin");
    assert_eq!(data["load_balancer"]["health_check"], false);
    assert_eq!(data["services"]["users"]["total_instances"], 1);
    assert_eq!(data["summary"]["total_services"], 2);
    assert_eq!(data["summary"]["healthy_instances"], 2);
}

#[tokio::test]
async fn test_services_lists_instances() {
    let h = harness(USERS);
    let (status, body) = call(&h.gateway, Method::GET, "/gateway/services", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    let users = body["data"]["services"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["service_name"] == "users")
        .unwrap();
    assert_eq!(users["url"], "http://127.0.0.1:9001");
    assert_eq!(users["weight"], 3);
    assert_eq!(users["source"], "config");
}

#[tokio::test]
async fn test_routes_include_management_and_prefixes() {
    let h = harness(USERS);
    let (status, body) = call(&h.gateway, Method::GET, "/gateway/routes", None).await;

    assert_eq!(status, StatusCode::OK);
    let routes = body["data"]["routes"].as_array().unwrap();
    assert_eq!(body["data"]["total"], routes.len());
    assert!(routes.iter().any(|r| r["method"] == "GET" && r["path"] == "/health"));
    assert!(routes
        .iter()
        .any(|r| r["method"] == "POST" && r["path"] == "/gateway/services/{name}/register"));

    let orders = routes.iter().find(|r| r["path"] == "/api/orders/*").unwrap();
    assert_eq!(orders["method"], "ANY");
    assert_eq!(orders["service"], "orders");
    assert_eq!(orders["auth"], true);
    assert!(routes.iter().any(|r| r["path"] == "/users/*" && r["auth"] == false));
}

#[tokio::test]
async fn test_register_and_unregister_instance() {
    let h = harness(USERS);
    let (status, body) = call(
        &h.gateway,
        Method::POST,
        "/gateway/services/users/register",
        Some(json!({ "url": "http://127.0.0.1:9101", "weight": 2, "health_check_path": "/ready" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Service registered successfully");
    let instance = &body["data"]["instance"];
    let id = instance["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("users-"));
    assert_eq!(instance["weight"], 2);
    assert_eq!(instance["health_check_path"], "/ready");
    assert_eq!(instance["source"], "dynamic");
    assert_eq!(h.gateway.registry().instances("users").unwrap().len(), 2);

    let uri = format!("/gateway/services/users/unregister?id={}", id);
    let (status, body) = call(&h.gateway, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], json!([id]));
    assert_eq!(h.gateway.registry().instances("users").unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_new_service() {
    let h = harness(USERS);
    let (status, _) = call(
        &h.gateway,
        Method::POST,
        "/gateway/services/billing/register",
        Some(json!({ "url": "http://127.0.0.1:9200" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&h.gateway, Method::GET, "/gateway/services", None).await;
    assert_eq!(body["data"]["total"], 3);
}

#[tokio::test]
async fn test_unregister_whole_service() {
    let h = harness(USERS);
    let (status, body) = call(&h.gateway, Method::DELETE, "/gateway/services/users/unregister", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], json!(["users-1"]));
    assert!(h.gateway.registry().instances("users").is_none());
}

#[tokio::test]
async fn test_register_rejects_bad_payloads() {
    let h = harness(USERS);
    for payload in [
        json!({ "weight": 1 }),
        json!({ "url": "not a url" }),
        json!({ "url": "ftp://127.0.0.1" }),
        json!({ "url": "https://127.0.0.1:9443" }),
        json!({ "url": "http://127.0.0.1:9300", "weight": -1 }),
        json!({ "url": "http://127.0.0.1:9300", "health_check_path": "ready" }),
    ] {
        let (status, body) = call(
            &h.gateway,
            Method::POST,
            "/gateway/services/users/register",
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
        assert_eq!(body["code"], 400);
        assert!(body["message"].as_str().unwrap().starts_with("Invalid request"));
    }
    assert_eq!(h.gateway.registry().instances("users").unwrap().len(), 1);
}

#[tokio::test]
async fn test_unregister_unknown_is_404() {
    let h = harness(USERS);
    let (status, body) = call(&h.gateway, Method::DELETE, "/gateway/services/ghost/unregister", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    let (status, _) = call(
        &h.gateway,
        Method::DELETE,
        "/gateway/services/users/unregister?id=users-99",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_management_responses_carry_security_headers() {
    let h = harness(USERS);
    let res = h
        .gateway
        .app()
        .oneshot(Request::get("/gateway/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = res.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
    assert!(headers.contains_key("x-request-id"));
}

fn cors_preflight(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri(uri)
        .header("origin", origin)
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let h = harness(USERS);
    let res = h
        .gateway
        .app()
        .oneshot(cors_preflight("/api/orders/1", "http://localhost:3000"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://localhost:3000");
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-max-age"], "86400");
    assert!(headers.contains_key("x-request-id"));

    let res = h
        .gateway
        .app()
        .oneshot(cors_preflight("/api/orders/1", "http://evil.example"))
        .await
        .unwrap();
    assert!(!res.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_exposes_gateway_headers() {
    let h = harness(USERS);
    let res = h
        .gateway
        .app()
        .oneshot(
            Request::get("/gateway/stats")
                .header("origin", "http://127.0.0.1:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let headers = res.headers();
    assert_eq!(headers["access-control-allow-origin"], "http://127.0.0.1:3000");
    let exposed = headers["access-control-expose-headers"].to_str().unwrap();
    assert!(exposed.contains("x-request-id"));
}

#[tokio::test]
async fn test_cors_disabled_with_empty_origin_list() {
    let h = harness(&format!("{}cors:\n  allowed_origins: []\n", USERS));
    let res = h
        .gateway
        .app()
        .oneshot(cors_preflight("/gateway/stats", "http://localhost:3000"))
        .await
        .unwrap();

    assert_ne!(res.status(), StatusCode::OK);
    assert!(!res.headers().contains_key("access-control-allow-origin"));
}
