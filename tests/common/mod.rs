#![allow(dead_code)]

use axum::Router;
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;
use lookup_tables::api::routes::{API_PREFIX, lookup_routes};
use lookup_tables::application::services::AuthService;
use lookup_tables::domain::change_event::ChangePublisher;
use lookup_tables::infrastructure::persistence::InMemoryRepository;
use lookup_tables::lookup::{LookupService, Registries};
use lookup_tables::state::AppState;

pub const SIGNING_SECRET: &str = "test-signing-secret";
pub const TOKEN: &str = "test-token";

/// State over in-memory storage where the live runtime is its own publisher,
/// so every mutation is applied before the response is sent.
pub fn create_test_state() -> AppState {
    let repo = Arc::new(InMemoryRepository::new());
    let registries = Arc::new(Registries::builtin());
    let lookup = Arc::new(LookupService::new(
        registries.clone(),
        repo.clone(),
        repo.clone(),
    ));
    let publisher: Arc<dyn ChangePublisher> = lookup.clone();
    let auth_service = AuthService::new(
        SIGNING_SECRET.to_string(),
        [AuthService::digest(SIGNING_SECRET, TOKEN)],
    );

    AppState::new(
        repo.clone(),
        repo,
        registries,
        publisher,
        lookup,
        auth_service,
    )
}

pub fn make_server() -> TestServer {
    let state = create_test_state();
    let app = Router::new().nest(API_PREFIX, lookup_routes(state.clone()).with_state(state));
    TestServer::new(app).unwrap()
}

pub fn url(path: &str) -> String {
    format!("{API_PREFIX}{path}")
}

pub async fn create_adapter(server: &TestServer, name: &str, entries: Value) -> Value {
    let response = server
        .post(&url("/adapters"))
        .authorization_bearer(TOKEN)
        .json(&json!({
            "name": name,
            "title": format!("{name} adapter"),
            "config": { "type": "staticmap", "entries": entries }
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

pub async fn create_cache(server: &TestServer, name: &str) -> Value {
    let response = server
        .post(&url("/caches"))
        .authorization_bearer(TOKEN)
        .json(&json!({
            "name": name,
            "title": format!("{name} cache"),
            "config": { "type": "memory", "max_size": 100 }
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

pub async fn create_table(server: &TestServer, name: &str, cache: &str, adapter: &str) -> Value {
    let response = server
        .post(&url("/tables"))
        .authorization_bearer(TOKEN)
        .json(&json!({
            "name": name,
            "title": format!("{name} table"),
            "cache_name": cache,
            "data_adapter_name": adapter,
            "default_single_value": "unknown"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

/// Adapter `geo-db`, cache `geo-cache` and table `geoip` wired together.
pub async fn seed_geoip(server: &TestServer) {
    create_adapter(
        server,
        "geo-db",
        json!({ "1.2.3.4": "DE", "5.6.7.8": { "country": "FR", "city": "Paris" } }),
    )
    .await;
    create_cache(server, "geo-cache").await;
    create_table(server, "geoip", "geo-cache", "geo-db").await;
}
