use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use crate::admin::MANAGEMENT_ROUTES;
use crate::config::duration;
use crate::config::validation::is_http_url;
use crate::error::ManagementError;
use crate::http::response::{ApiResponse, GATEWAY_VERSION};
use crate::http::server::AppState;
use crate::registry::service_registry::{RegistrySummary, ServiceStats};
use crate::registry::ServiceInstance;
use crate::routing::RouteInfo;

#[derive(Debug, Serialize)]
pub struct InstanceHealth {
    pub id: String,
    pub url: String,
    pub healthy: bool,
    pub last_check: i64,
    pub failure_count: u32,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub healthy: bool,
    pub healthy_instances: usize,
    pub total_instances: usize,
    pub instances: Vec<InstanceHealth>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: i64,
    pub uptime: String,
    pub version: &'static str,
    pub services: BTreeMap<String, ServiceHealth>,
}

fn uptime(state: &AppState) -> String {
    duration::format(Duration::from_secs(state.started.elapsed().as_secs()))
}

/// Aggregate health of every registered service. `degraded` when any
/// service has no healthy instance.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let services: BTreeMap<String, ServiceHealth> = state
        .registry
        .services()
        .into_iter()
        .map(|(name, instances)| {
            let healthy_instances = instances.iter().filter(|i| i.healthy).count();
            let health = ServiceHealth {
                healthy: healthy_instances > 0,
                healthy_instances,
                total_instances: instances.len(),
                instances: instances
                    .into_iter()
                    .map(|i| InstanceHealth {
                        id: i.id,
                        url: i.url,
                        healthy: i.healthy,
                        last_check: i.last_check.timestamp(),
                        failure_count: i.failure_count,
                    })
                    .collect(),
            };
            (name, health)
        })
        .collect();

    let status = if services.values().all(|s| s.healthy) { "healthy" } else { "degraded" };
    Json(HealthReport {
        status,
        timestamp: Utc::now().timestamp(),
        uptime: uptime(&state),
        version: GATEWAY_VERSION,
        services,
    })
}

#[derive(Debug, Serialize)]
pub struct GatewayInfo {
    pub version: &'static str,
    pub uptime: String,
    pub start_time: i64,
}

#[derive(Debug, Serialize)]
pub struct ConfigInfo {
    pub port: u32,
    pub rate_limit: i64,
    pub timeout: String,
}

#[derive(Debug, Serialize)]
pub struct BalancerInfo {
    pub strategy: String,
    pub health_check: bool,
}

#[derive(Debug, Serialize)]
pub struct GatewayStats {
    pub gateway: GatewayInfo,
    pub config: ConfigInfo,
    pub load_balancer: BalancerInfo,
    pub services: BTreeMap<String, ServiceStats>,
    pub summary: RegistrySummary,
}

pub async fn stats(State(state): State<AppState>) -> Json<ApiResponse<GatewayStats>> {
    let config = state.config.config();
    let registry = state.registry.stats();
    Json(ApiResponse::ok(
        "Stats retrieved successfully",
        GatewayStats {
            gateway: GatewayInfo {
                version: GATEWAY_VERSION,
                uptime: uptime(&state),
                start_time: state.started_at.timestamp(),
            },
            config: ConfigInfo {
                port: config.port,
                rate_limit: config.rate_limit,
                timeout: duration::format(config.timeout),
            },
            load_balancer: BalancerInfo {
                strategy: state.balancer.strategy().to_string(),
                health_check: config.load_balancer.health_check,
            },
            services: registry.services,
            summary: registry.summary,
        },
    ))
}

#[derive(Debug, Serialize)]
pub struct ServiceList {
    pub total: usize,
    pub services: Vec<ServiceInstance>,
}

pub async fn services(State(state): State<AppState>) -> Json<ApiResponse<ServiceList>> {
    let services: Vec<ServiceInstance> = state.registry.services().into_values().flatten().collect();
    Json(ApiResponse::ok(
        "Services retrieved successfully",
        ServiceList {
            total: services.len(),
            services,
        },
    ))
}

#[derive(Debug, Serialize)]
pub struct RouteList {
    pub total: usize,
    pub routes: Vec<RouteInfo>,
}

pub async fn routes(State(state): State<AppState>) -> Json<ApiResponse<RouteList>> {
    let mut routes: Vec<RouteInfo> = MANAGEMENT_ROUTES
        .iter()
        .map(|(method, path)| RouteInfo {
            method: method.to_string(),
            path: path.to_string(),
            service: None,
            auth: false,
        })
        .collect();
    routes.extend(state.router.table().routes().iter().map(|route| RouteInfo {
        method: "ANY".to_string(),
        path: format!("{}/*", route.matcher.prefix().trim_end_matches('/')),
        service: Some(route.service.clone()),
        auth: route.auth,
    }));

    Json(ApiResponse::ok(
        "Routes retrieved successfully",
        RouteList {
            total: routes.len(),
            routes,
        },
    ))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub url: String,
    #[serde(default)]
    pub weight: Option<i64>,
    #[serde(default)]
    pub health_check_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Registered {
    pub service: String,
    pub instance: ServiceInstance,
}

/// Register one dynamic instance under `name`. Lives in memory only.
pub async fn register(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<Registered>>, ManagementError> {
    let request: RegisterRequest =
        serde_json::from_slice(&body).map_err(|e| ManagementError::InvalidPayload(e.to_string()))?;

    if !is_http_url(&request.url) {
        return Err(ManagementError::InvalidPayload(format!(
            "invalid url {:?} (expected http://host[:port])",
            request.url
        )));
    }
    let weight = request.weight.unwrap_or(1);
    let weight = u32::try_from(weight)
        .map_err(|_| ManagementError::InvalidPayload(format!("invalid weight {}", weight)))?;
    if let Some(path) = &request.health_check_path {
        if !path.is_empty() && !path.starts_with('/') {
            return Err(ManagementError::InvalidPayload(format!(
                "health_check_path must start with '/': {:?}",
                path
            )));
        }
    }

    let id = format!("{}-{}", name, Uuid::new_v4().simple());
    let candidate = ServiceInstance::new(&name, id, request.url)
        .with_weight(weight)
        .with_health_check_path(request.health_check_path.unwrap_or_default());
    let instance = state.registry.register(candidate)?;

    Ok(Json(ApiResponse::ok(
        "Service registered successfully",
        Registered { service: name, instance },
    )))
}

#[derive(Debug, Deserialize)]
pub struct UnregisterParams {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Unregistered {
    pub service: String,
    pub removed: Vec<String>,
}

/// Remove one instance (`?id=`) or every instance of `name`.
pub async fn unregister(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<UnregisterParams>,
) -> Result<Json<ApiResponse<Unregistered>>, ManagementError> {
    let removed = match params.id.filter(|id| !id.is_empty()) {
        Some(id) => vec![state.registry.unregister(&name, &id)?.id],
        None => state
            .registry
            .unregister_service(&name)?
            .into_iter()
            .map(|i| i.id)
            .collect(),
    };

    Ok(Json(ApiResponse::ok(
        "Service unregistered successfully",
        Unregistered { service: name, removed },
    )))
}
