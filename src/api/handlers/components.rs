//! Handlers for cache and data adapter endpoints.
//!
//! Caches and adapters share one service; each endpoint is a thin wrapper
//! fixing the [`ComponentKind`].

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::api::dto::component::{
    AdapterListResponse, CacheListResponse, ComponentRequest, ComponentResponse,
};
use crate::api::dto::lookup::{KeyParams, PurgeParams, ValidationResponse};
use crate::api::dto::pagination::{ListParams, PageMeta};
use crate::domain::entities::ComponentKind;
use crate::error::AppError;
use crate::lookup::{LookupKey, LookupResult};
use crate::state::AppState;

async fn create(
    state: &AppState,
    kind: ComponentKind,
    payload: ComponentRequest,
) -> Result<(StatusCode, Json<ComponentResponse>), AppError> {
    let created = state
        .component_service
        .create(payload.into_new(kind))
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn update(
    state: &AppState,
    kind: ComponentKind,
    id_or_name: &str,
    payload: ComponentRequest,
) -> Result<Json<ComponentResponse>, AppError> {
    let updated = state
        .component_service
        .update(id_or_name, payload.into_new(kind))
        .await?;
    Ok(Json(updated.into()))
}

async fn validate(
    state: &AppState,
    kind: ComponentKind,
    payload: ComponentRequest,
) -> Result<Json<ValidationResponse>, AppError> {
    let id = payload.id;
    let errors = state
        .component_service
        .validate(id, &payload.into_new(kind))
        .await?;
    Ok(Json(errors.into()))
}

// ─── Caches ─────────────────────────────────────────────────────────────────

/// Lists caches.
///
/// # Endpoint
///
/// `GET /api/system/lookup/caches?page&per_page&sort&order&query`
pub async fn list_caches_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<CacheListResponse>, AppError> {
    let query = params.to_query()?;
    let page = state
        .component_service
        .list(ComponentKind::Cache, &query)
        .await?;

    Ok(Json(CacheListResponse {
        meta: PageMeta::of(&page, &query),
        caches: page.items.into_iter().map(Into::into).collect(),
    }))
}

/// Creates a cache.
///
/// # Errors
///
/// Returns 400 with a field map if the input is invalid.
/// Returns 409 if the name is already in use.
pub async fn create_cache_handler(
    State(state): State<AppState>,
    Json(payload): Json<ComponentRequest>,
) -> Result<(StatusCode, Json<ComponentResponse>), AppError> {
    create(&state, ComponentKind::Cache, payload).await
}

pub async fn get_cache_handler(
    Path(id_or_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ComponentResponse>, AppError> {
    let cache = state
        .component_service
        .get(ComponentKind::Cache, &id_or_name)
        .await?;
    Ok(Json(cache.into()))
}

/// Replaces a cache.
///
/// # Errors
///
/// Returns 409 `in_use` when renaming a cache that tables reference.
pub async fn update_cache_handler(
    Path(id_or_name): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ComponentRequest>,
) -> Result<Json<ComponentResponse>, AppError> {
    update(&state, ComponentKind::Cache, &id_or_name, payload).await
}

/// Deletes a cache and returns the deleted record.
///
/// # Errors
///
/// Returns 404 if the cache does not exist.
/// Returns 409 `in_use` while tables reference it.
pub async fn delete_cache_handler(
    Path(id_or_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ComponentResponse>, AppError> {
    let deleted = state
        .component_service
        .delete(ComponentKind::Cache, &id_or_name)
        .await?;
    Ok(Json(deleted.into()))
}

/// `POST /api/system/lookup/caches/validate`
pub async fn validate_cache_handler(
    State(state): State<AppState>,
    Json(payload): Json<ComponentRequest>,
) -> Result<Json<ValidationResponse>, AppError> {
    validate(&state, ComponentKind::Cache, payload).await
}

/// Purges one key, or every entry, of a live cache.
///
/// # Endpoint
///
/// `POST /api/system/lookup/caches/{name}/purge?key=K`
///
/// Loads in flight at the time of the purge may still store their result.
pub async fn purge_cache_handler(
    Path(name): Path<String>,
    Query(params): Query<PurgeParams>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let key = params.key.map(LookupKey::new);
    state.lookup.purge_cache(&name, key.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Data adapters ──────────────────────────────────────────────────────────

/// Lists data adapters.
///
/// # Endpoint
///
/// `GET /api/system/lookup/adapters?page&per_page&sort&order&query`
pub async fn list_adapters_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<AdapterListResponse>, AppError> {
    let query = params.to_query()?;
    let page = state
        .component_service
        .list(ComponentKind::DataAdapter, &query)
        .await?;

    Ok(Json(AdapterListResponse {
        meta: PageMeta::of(&page, &query),
        data_adapters: page.items.into_iter().map(Into::into).collect(),
    }))
}

pub async fn create_adapter_handler(
    State(state): State<AppState>,
    Json(payload): Json<ComponentRequest>,
) -> Result<(StatusCode, Json<ComponentResponse>), AppError> {
    create(&state, ComponentKind::DataAdapter, payload).await
}

pub async fn get_adapter_handler(
    Path(id_or_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ComponentResponse>, AppError> {
    let adapter = state
        .component_service
        .get(ComponentKind::DataAdapter, &id_or_name)
        .await?;
    Ok(Json(adapter.into()))
}

pub async fn update_adapter_handler(
    Path(id_or_name): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ComponentRequest>,
) -> Result<Json<ComponentResponse>, AppError> {
    update(&state, ComponentKind::DataAdapter, &id_or_name, payload).await
}

pub async fn delete_adapter_handler(
    Path(id_or_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ComponentResponse>, AppError> {
    let deleted = state
        .component_service
        .delete(ComponentKind::DataAdapter, &id_or_name)
        .await?;
    Ok(Json(deleted.into()))
}

pub async fn validate_adapter_handler(
    State(state): State<AppState>,
    Json(payload): Json<ComponentRequest>,
) -> Result<Json<ValidationResponse>, AppError> {
    validate(&state, ComponentKind::DataAdapter, payload).await
}

/// Fetches a key from a live adapter, bypassing caches.
///
/// # Endpoint
///
/// `GET /api/system/lookup/adapters/{name}/query?key=K`
///
/// # Errors
///
/// Returns 404 if no such adapter is live, 502 if the fetch fails.
pub async fn query_adapter_handler(
    Path(name): Path<String>,
    Query(params): Query<KeyParams>,
    State(state): State<AppState>,
) -> Result<Json<LookupResult>, AppError> {
    let result = state
        .lookup
        .query_data_adapter(&name, &params.lookup_key())
        .await?;
    Ok(Json(result))
}
