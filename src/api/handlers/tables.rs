//! Handlers for lookup table endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::api::dto::lookup::{KeyParams, ValidationResponse};
use crate::api::dto::pagination::{ListParams, PageMeta};
use crate::api::dto::table::{TableListResponse, TableRequest, TableResponse};
use crate::domain::entities::{ComponentKind, NewTable};
use crate::error::AppError;
use crate::lookup::LookupResult;
use crate::state::AppState;

/// Lists lookup tables.
///
/// # Endpoint
///
/// `GET /api/system/lookup/tables?page&per_page&sort&order&query&resolve`
///
/// With `resolve=true` the response also carries the caches and data
/// adapters referenced by the tables on the page, keyed by id.
pub async fn list_tables_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<TableListResponse>, AppError> {
    let query = params.to_query()?;
    let page = state.table_service.list(&query).await?;
    let meta = PageMeta::of(&page, &query);

    let (caches, data_adapters) = if params.resolve() {
        let cache_names: Vec<String> = page.items.iter().map(|t| t.cache_name.clone()).collect();
        let adapter_names: Vec<String> = page
            .items
            .iter()
            .map(|t| t.data_adapter_name.clone())
            .collect();

        let caches = state
            .component_service
            .by_names(ComponentKind::Cache, &cache_names)
            .await?;
        let adapters = state
            .component_service
            .by_names(ComponentKind::DataAdapter, &adapter_names)
            .await?;

        (
            Some(caches.into_iter().map(|(id, c)| (id, c.into())).collect()),
            Some(adapters.into_iter().map(|(id, a)| (id, a.into())).collect()),
        )
    } else {
        (None, None)
    };

    Ok(Json(TableListResponse {
        meta,
        lookup_tables: page.items.into_iter().map(Into::into).collect(),
        caches,
        data_adapters,
    }))
}

/// Creates a lookup table.
///
/// # Errors
///
/// Returns 400 with a field map if the input is invalid or names an unknown
/// cache or adapter. Returns 409 if the name is already in use.
pub async fn create_table_handler(
    State(state): State<AppState>,
    Json(payload): Json<TableRequest>,
) -> Result<(StatusCode, Json<TableResponse>), AppError> {
    let created = state.table_service.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn get_table_handler(
    Path(id_or_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TableResponse>, AppError> {
    let table = state.table_service.get(&id_or_name).await?;
    Ok(Json(table.into()))
}

pub async fn update_table_handler(
    Path(id_or_name): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<TableRequest>,
) -> Result<Json<TableResponse>, AppError> {
    let updated = state
        .table_service
        .update(&id_or_name, payload.into())
        .await?;
    Ok(Json(updated.into()))
}

pub async fn delete_table_handler(
    Path(id_or_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TableResponse>, AppError> {
    let deleted = state.table_service.delete(&id_or_name).await?;
    Ok(Json(deleted.into()))
}

/// `POST /api/system/lookup/tables/validate`
pub async fn validate_table_handler(
    State(state): State<AppState>,
    Json(payload): Json<TableRequest>,
) -> Result<Json<ValidationResponse>, AppError> {
    let id = payload.id;
    let new = NewTable::from(payload);
    let errors = state.table_service.validate(id, &new).await?;
    Ok(Json(errors.into()))
}

/// Resolves a key through a live table.
///
/// # Endpoint
///
/// `GET /api/system/lookup/tables/{name}/query?key=K`
///
/// # Errors
///
/// Returns 404 if the table, its cache or its adapter is not live.
/// Returns 502 if the load fails; the failure is kept as the error state of
/// the cache and adapter.
pub async fn query_table_handler(
    Path(name): Path<String>,
    Query(params): Query<KeyParams>,
    State(state): State<AppState>,
) -> Result<Json<LookupResult>, AppError> {
    let table = state.lookup.new_builder().lookup_table(name).build()?;
    let result = table.lookup(&params.lookup_key()).await?;
    Ok(Json(result))
}
