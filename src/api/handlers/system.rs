//! Handlers for type descriptors and runtime error states.

use axum::{Json, extract::State};
use std::collections::BTreeMap;

use crate::api::dto::lookup::ErrorStatesRequest;
use crate::domain::entities::ComponentKind;
use crate::lookup::{Descriptor, ErrorStates};
use crate::state::AppState;

/// `GET /api/system/lookup/types/caches`
pub async fn cache_types_handler(State(state): State<AppState>) -> Json<BTreeMap<String, Descriptor>> {
    Json(state.component_service.types(ComponentKind::Cache))
}

/// `GET /api/system/lookup/types/adapters`
pub async fn adapter_types_handler(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, Descriptor>> {
    Json(state.component_service.types(ComponentKind::DataAdapter))
}

/// Reports the current error of each named live instance.
///
/// # Endpoint
///
/// `POST /api/system/lookup/errorstates`
///
/// # Response
///
/// ```json
/// {
///   "tables": { "geoip": null },
///   "data_adapters": { "geo-db": "fetch failed: upstream 503" },
///   "caches": { "geo-cache": null }
/// }
/// ```
///
/// Names without a live instance are omitted.
pub async fn error_states_handler(
    State(state): State<AppState>,
    Json(request): Json<ErrorStatesRequest>,
) -> Json<ErrorStates> {
    Json(
        state
            .lookup
            .error_states(&request.tables, &request.data_adapters, &request.caches),
    )
}
