use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use lookup_tables::domain::entities::{ComponentKind, NewComponent, NewTable};
use lookup_tables::domain::repositories::{
    ComponentRepository, ListQuery, SortField, SortOrder, TableRepository,
};
use lookup_tables::error::AppError;
use lookup_tables::infrastructure::persistence::{PgComponentRepository, PgTableRepository};
use lookup_tables::lookup::PluginConfig;

fn new_cache(name: &str) -> NewComponent {
    NewComponent {
        kind: ComponentKind::Cache,
        name: name.to_string(),
        title: format!("{name} title"),
        description: None,
        config: PluginConfig::new("memory").with_field("max_size", 10),
    }
}

fn new_table(name: &str, cache: &str, adapter: &str) -> NewTable {
    NewTable {
        name: name.to_string(),
        title: format!("{name} title"),
        description: Some("Resolves addresses".to_string()),
        cache_name: cache.to_string(),
        data_adapter_name: adapter.to_string(),
        default_single_value: Some(json!("unknown")),
        default_multi_value: None,
    }
}

// ─── COMPONENTS ──────────────────────────────────────────────────────────────

#[sqlx::test]
async fn test_create_and_find_component(pool: PgPool) {
    let repo = PgComponentRepository::new(Arc::new(pool));

    let created = repo.create(new_cache("geo-cache")).await.unwrap();
    assert_eq!(created.kind, ComponentKind::Cache);
    assert_eq!(created.config.type_name(), "memory");

    let by_name = repo
        .find_by_name(ComponentKind::Cache, "geo-cache")
        .await
        .unwrap();
    assert_eq!(by_name.as_ref().map(|c| c.id), Some(created.id));

    let other_kind = repo
        .find_by_name(ComponentKind::DataAdapter, "geo-cache")
        .await
        .unwrap();
    assert!(other_kind.is_none());
}

#[sqlx::test]
async fn test_duplicate_component_name_is_conflict(pool: PgPool) {
    let repo = PgComponentRepository::new(Arc::new(pool));
    repo.create(new_cache("geo-cache")).await.unwrap();

    let result = repo.create(new_cache("geo-cache")).await;

    assert!(matches!(result, Err(AppError::Conflict { .. })));
}

#[sqlx::test]
async fn test_update_component_keeps_created_at(pool: PgPool) {
    let repo = PgComponentRepository::new(Arc::new(pool));
    let created = repo.create(new_cache("geo-cache")).await.unwrap();

    let mut update = new_cache("geo-cache");
    update.config = PluginConfig::new("none");
    let updated = repo.update(created.id, update).await.unwrap();

    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.config.type_name(), "none");
}

#[sqlx::test]
async fn test_list_components_search_and_sort(pool: PgPool) {
    let repo = PgComponentRepository::new(Arc::new(pool));
    for name in ["geo-cache", "geo-fallback", "user-cache"] {
        repo.create(new_cache(name)).await.unwrap();
    }

    let query = ListQuery {
        sort: SortField::Name,
        order: SortOrder::Desc,
        query: Some("GEO".to_string()),
        ..ListQuery::default()
    };
    let page = repo.list(ComponentKind::Cache, &query).await.unwrap();

    assert_eq!(page.total, 2);
    let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["geo-fallback", "geo-cache"]);
}

#[sqlx::test]
async fn test_delete_component(pool: PgPool) {
    let repo = PgComponentRepository::new(Arc::new(pool));
    let created = repo.create(new_cache("geo-cache")).await.unwrap();

    assert!(repo.delete(ComponentKind::Cache, created.id).await.unwrap());
    assert!(!repo.delete(ComponentKind::Cache, created.id).await.unwrap());
}

// ─── TABLES ──────────────────────────────────────────────────────────────────

#[sqlx::test]
async fn test_create_table_round_trips_defaults(pool: PgPool) {
    let repo = PgTableRepository::new(Arc::new(pool));

    let created = repo
        .create(new_table("geoip", "geo-cache", "geo-db"))
        .await
        .unwrap();

    let found = repo.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(found.default_single_value, Some(json!("unknown")));
    assert_eq!(found.default_multi_value, None);
    assert_eq!(found.description.as_deref(), Some("Resolves addresses"));
}

#[sqlx::test]
async fn test_reference_counts(pool: PgPool) {
    let repo = PgTableRepository::new(Arc::new(pool));
    repo.create(new_table("geoip", "geo-cache", "geo-db"))
        .await
        .unwrap();
    repo.create(new_table("geoip-v6", "geo-cache", "geo-db-v6"))
        .await
        .unwrap();

    assert_eq!(repo.count_by_cache("geo-cache").await.unwrap(), 2);
    assert_eq!(repo.count_by_adapter("geo-db").await.unwrap(), 1);
    assert_eq!(repo.count_by_adapter("unused").await.unwrap(), 0);
}

#[sqlx::test]
async fn test_list_all_tables(pool: PgPool) {
    let repo = PgTableRepository::new(Arc::new(pool));
    repo.create(new_table("a", "c", "d")).await.unwrap();
    repo.create(new_table("b", "c", "d")).await.unwrap();

    assert_eq!(repo.list_all().await.unwrap().len(), 2);
}
