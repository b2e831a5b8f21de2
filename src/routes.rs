//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET /api/system/lookup/health` - Storage and live instance check (public)
//! - `/api/system/lookup/*`          - Management API (Bearer token required)
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket
//! - **Authentication** - Bearer token digest check
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::middleware::{rate_limit, tracing};
use crate::api::routes::API_PREFIX;
use crate::state::AppState;
use axum::Router;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState) -> NormalizePath<Router> {
    let lookup_router = api::routes::lookup_routes(state.clone()).layer(rate_limit::layer());

    let router = Router::new()
        .nest(API_PREFIX, lookup_router)
        .with_state(state)
        .layer(tracing::layer());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
