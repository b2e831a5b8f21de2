//! API route configuration.
//!
//! Everything except the health check requires Bearer token authentication
//! via [`crate::api::middleware::auth`].

use crate::api::handlers::{
    adapter_types_handler, cache_types_handler, create_adapter_handler, create_cache_handler,
    create_table_handler, delete_adapter_handler, delete_cache_handler, delete_table_handler,
    error_states_handler, get_adapter_handler, get_cache_handler, get_table_handler,
    health_handler, list_adapters_handler, list_caches_handler, list_tables_handler,
    purge_cache_handler, query_adapter_handler, query_table_handler, update_adapter_handler,
    update_cache_handler, update_table_handler, validate_adapter_handler, validate_cache_handler,
    validate_table_handler,
};
use crate::api::middleware::auth;
use crate::state::AppState;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Base path of the lookup management API.
pub const API_PREFIX: &str = "/api/system/lookup";

/// Management routes, protected by Bearer token authentication.
///
/// # Endpoints
///
/// - `GET|POST         /tables`                  - List / create lookup tables
/// - `POST             /tables/validate`         - Validate a table without storing it
/// - `GET|PUT|DELETE   /tables/{id_or_name}`     - Read / replace / delete a table
/// - `GET              /tables/{name}/query`     - Resolve `?key=` through a live table
/// - `GET|POST         /adapters`                - List / create data adapters
/// - `POST             /adapters/validate`       - Validate an adapter
/// - `GET|PUT|DELETE   /adapters/{id_or_name}`   - Read / replace / delete an adapter
/// - `GET              /adapters/{name}/query`   - Fetch `?key=` from a live adapter
/// - `GET|POST         /caches`                  - List / create caches
/// - `POST             /caches/validate`         - Validate a cache
/// - `GET|PUT|DELETE   /caches/{id_or_name}`     - Read / replace / delete a cache
/// - `POST             /caches/{name}/purge`     - Purge `?key=` or the whole cache
/// - `GET              /types/adapters`          - Registered adapter types
/// - `GET              /types/caches`            - Registered cache types
/// - `POST             /errorstates`             - Error state of live instances
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/tables", get(list_tables_handler).post(create_table_handler))
        .route("/tables/validate", post(validate_table_handler))
        .route(
            "/tables/{id_or_name}",
            get(get_table_handler)
                .put(update_table_handler)
                .delete(delete_table_handler),
        )
        .route("/tables/{id_or_name}/query", get(query_table_handler))
        .route(
            "/adapters",
            get(list_adapters_handler).post(create_adapter_handler),
        )
        .route("/adapters/validate", post(validate_adapter_handler))
        .route(
            "/adapters/{id_or_name}",
            get(get_adapter_handler)
                .put(update_adapter_handler)
                .delete(delete_adapter_handler),
        )
        .route("/adapters/{id_or_name}/query", get(query_adapter_handler))
        .route("/caches", get(list_caches_handler).post(create_cache_handler))
        .route("/caches/validate", post(validate_cache_handler))
        .route(
            "/caches/{id_or_name}",
            get(get_cache_handler)
                .put(update_cache_handler)
                .delete(delete_cache_handler),
        )
        .route("/caches/{id_or_name}/purge", post(purge_cache_handler))
        .route("/types/adapters", get(adapter_types_handler))
        .route("/types/caches", get(cache_types_handler))
        .route("/errorstates", post(error_states_handler))
}

/// Protected routes behind the auth layer, plus the public health check.
///
/// Mounted under [`API_PREFIX`] by [`crate::routes::app_router`]; tests
/// mount it directly.
pub fn lookup_routes(state: AppState) -> Router<AppState> {
    protected_routes()
        .route_layer(middleware::from_fn_with_state(state, auth::layer))
        .route("/health", get(health_handler))
}
