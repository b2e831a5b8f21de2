//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::domain::repositories::ListQuery;
use crate::lookup::LiveSummary;
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /api/system/lookup/health` (no authentication)
///
/// # Response Codes
///
/// - **200 OK**: Configuration storage reachable
/// - **503 Service Unavailable**: Storage unreachable
///
/// Live caches or adapters that are not running are reported as a warning
/// under `instances` but do not fail the check.
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let storage = check_storage(&state).await;
    let live = state.lookup.live_summary();
    let instances = check_instances(&live);

    let healthy = storage.status == "ok";

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks { storage, instances },
        live,
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Checks configuration storage by listing one table.
async fn check_storage(state: &AppState) -> CheckStatus {
    let query = ListQuery {
        per_page: 1,
        ..ListQuery::default()
    };
    match state.table_service.list(&query).await {
        Ok(page) => CheckStatus {
            status: "ok".to_string(),
            message: Some(format!("{} lookup tables configured", page.total)),
        },
        Err(e) => CheckStatus {
            status: "error".to_string(),
            message: Some(format!("Storage error: {e}")),
        },
    }
}

fn check_instances(live: &LiveSummary) -> CheckStatus {
    if live.not_running == 0 {
        CheckStatus {
            status: "ok".to_string(),
            message: None,
        }
    } else {
        CheckStatus {
            status: "warning".to_string(),
            message: Some(format!(
                "{} caches or data adapters not running",
                live.not_running
            )),
        }
    }
}
