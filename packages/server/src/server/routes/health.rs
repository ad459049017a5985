use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::domains::policy::PolicyStats;
use crate::server::app::AppState;

const STORE_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    policy_store: PolicyStoreHealth,
    policy: PolicyStats,
}

#[derive(Serialize)]
pub struct PolicyStoreHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Pings the policy store behind the shared enforcer and reports the size of
/// the active policy snapshot. Returns 200 OK when the store answers within
/// five seconds, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let store = state.deps.policy_store().clone();

    let store_health = match tokio::time::timeout(STORE_PING_TIMEOUT, store.ping()).await {
        Ok(Ok(())) => PolicyStoreHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => PolicyStoreHealth {
            status: "error".to_string(),
            error: Some(format!("Ping failed: {}", e)),
        },
        Err(_) => PolicyStoreHealth {
            status: "error".to_string(),
            error: Some("Ping timeout (>5s)".to_string()),
        },
    };

    let is_healthy = store_health.status == "ok";
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            policy_store: store_health,
            policy: state.deps.enforcer.stats(),
        }),
    )
}
