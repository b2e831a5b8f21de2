mod common;

use common::{TOKEN, make_server, seed_geoip, url};
use serde_json::{Value, json};

// ─── AUTH ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let server = make_server();

    let response = server.get(&url("/tables")).await;

    response.assert_status_unauthorized();
    assert_eq!(response.json::<Value>()["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let server = make_server();

    server
        .get(&url("/tables"))
        .authorization_bearer("not-a-valid-token")
        .await
        .assert_status_unauthorized();
}

// ─── TYPES ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cache_types() {
    let server = make_server();

    let response = server
        .get(&url("/types/caches"))
        .authorization_bearer(TOKEN)
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    for name in ["none", "memory", "redis"] {
        assert_eq!(json[name]["type"], name);
        assert_eq!(json[name]["default_config"]["type"], name);
    }
}

#[tokio::test]
async fn test_adapter_types() {
    let server = make_server();

    let response = server
        .get(&url("/types/adapters"))
        .authorization_bearer(TOKEN)
        .await;

    response.assert_status_ok();
    assert!(response.json::<Value>().get("staticmap").is_some());
}

// ─── ERROR STATES ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_error_states_of_healthy_instances() {
    let server = make_server();
    seed_geoip(&server).await;

    let response = server
        .post(&url("/errorstates"))
        .authorization_bearer(TOKEN)
        .json(&json!({
            "tables": ["geoip"],
            "data_adapters": ["geo-db"],
            "caches": ["geo-cache", "missing"]
        }))
        .await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["tables"], json!({ "geoip": null }));
    assert_eq!(json["data_adapters"], json!({ "geo-db": null }));
    assert_eq!(json["caches"], json!({ "geo-cache": null }));
}

// ─── HEALTH ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_is_public() {
    let server = make_server();
    seed_geoip(&server).await;

    let response = server.get(&url("/health")).await;

    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["storage"]["status"], "ok");
    assert_eq!(json["checks"]["instances"]["status"], "ok");
    assert_eq!(json["live"]["tables"], 1);
    assert_eq!(json["live"]["caches"], 1);
    assert_eq!(json["live"]["data_adapters"], 1);
}
