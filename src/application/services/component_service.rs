//! Management of cache and data adapter configurations.

use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::application::services::validation::{
    IdOrName, add_error, check_name, check_title, ensure_storable, merge_config_errors,
};
use crate::domain::change_event::{ChangeEvent, ChangePublisher};
use crate::domain::entities::{Component, ComponentKind, NewComponent};
use crate::domain::repositories::{ComponentRepository, ListQuery, Page, TableRepository};
use crate::error::AppError;
use crate::lookup::{Descriptor, FieldErrors, Registries};

/// Service for caches and data adapters.
///
/// Both kinds behave the same: a record is identified by id or name, its
/// name is unique within the kind, and it cannot be deleted or renamed while
/// a lookup table references it. Every successful mutation is announced
/// through the [`ChangePublisher`] so live instances follow.
pub struct ComponentService {
    components: Arc<dyn ComponentRepository>,
    tables: Arc<dyn TableRepository>,
    registries: Arc<Registries>,
    publisher: Arc<dyn ChangePublisher>,
}

impl ComponentService {
    pub fn new(
        components: Arc<dyn ComponentRepository>,
        tables: Arc<dyn TableRepository>,
        registries: Arc<Registries>,
        publisher: Arc<dyn ChangePublisher>,
    ) -> Self {
        Self {
            components,
            tables,
            registries,
            publisher,
        }
    }

    /// Validates a submitted configuration without storing it.
    ///
    /// `id` is the record being updated, if any; its own name does not count
    /// as a duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the uniqueness check cannot be performed.
    pub async fn validate(
        &self,
        id: Option<i64>,
        new: &NewComponent,
    ) -> Result<FieldErrors, AppError> {
        Ok(self.check(id, new).await?.0)
    }

    /// Field errors plus whether the name belongs to another record.
    async fn check(
        &self,
        id: Option<i64>,
        new: &NewComponent,
    ) -> Result<(FieldErrors, bool), AppError> {
        let mut errors = FieldErrors::new();
        let mut name_taken = false;

        check_name(&mut errors, &new.name);
        if !errors.contains_key("name") {
            if let Some(existing) = self.components.find_by_name(new.kind, &new.name).await? {
                if Some(existing.id) != id {
                    name_taken = true;
                    add_error(
                        &mut errors,
                        "name",
                        format!("The {} name is already in use.", noun(new.kind)),
                    );
                }
            }
        }
        check_title(&mut errors, &new.title);

        let config_errors = match new.kind {
            ComponentKind::Cache => self.registries.caches.validate(&new.config),
            ComponentKind::DataAdapter => self.registries.adapters.validate(&new.config),
        };
        merge_config_errors(&mut errors, config_errors);

        Ok((errors, name_taken))
    }

    /// Creates a new cache or data adapter.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] with a field map if the input is invalid,
    /// [`AppError::Conflict`] if the name is already in use.
    pub async fn create(&self, new: NewComponent) -> Result<Component, AppError> {
        let (errors, name_taken) = self.check(None, &new).await?;
        ensure_storable(errors, name_taken)?;

        let created = self.components.create(new).await?;
        info!(kind = %created.kind, id = created.id, name = %created.name, "Component created");

        self.publisher
            .publish(ChangeEvent::updated(created.kind, created.id))
            .await;
        Ok(created)
    }

    /// Replaces the record addressed by `id_or_name`.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the record does not exist
    /// - [`AppError::Validation`] if the input is invalid
    /// - [`AppError::Conflict`] if the new name belongs to another record
    /// - [`AppError::InUse`] if the name changes while tables reference it
    pub async fn update(&self, id_or_name: &str, new: NewComponent) -> Result<Component, AppError> {
        let existing = self.get(new.kind, id_or_name).await?;
        let (errors, name_taken) = self.check(Some(existing.id), &new).await?;
        ensure_storable(errors, name_taken)?;

        if existing.name != new.name {
            self.ensure_unreferenced(&existing, "rename").await?;
        }

        let updated = self.components.update(existing.id, new).await?;
        info!(kind = %updated.kind, id = updated.id, name = %updated.name, "Component updated");

        self.publisher
            .publish(ChangeEvent::updated(updated.kind, updated.id))
            .await;
        Ok(updated)
    }

    /// Finds a record by numeric id or by name.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no record of `kind` matches.
    pub async fn get(&self, kind: ComponentKind, id_or_name: &str) -> Result<Component, AppError> {
        let found = match IdOrName::parse(id_or_name) {
            IdOrName::Id(id) => self.components.find_by_id(kind, id).await?,
            IdOrName::Name(name) => self.components.find_by_name(kind, name).await?,
        };
        found.ok_or_else(|| {
            AppError::not_found(
                format!("{} not found", kind.label()),
                json!({ "id_or_name": id_or_name }),
            )
        })
    }

    pub async fn list(
        &self,
        kind: ComponentKind,
        query: &ListQuery,
    ) -> Result<Page<Component>, AppError> {
        self.components.list(kind, query).await
    }

    /// Records of `kind` with the given names, keyed by id.
    pub async fn by_names(
        &self,
        kind: ComponentKind,
        names: &[String],
    ) -> Result<BTreeMap<i64, Component>, AppError> {
        let found = self.components.find_by_names(kind, names).await?;
        Ok(found.into_iter().map(|c| (c.id, c)).collect())
    }

    /// Deletes the record addressed by `id_or_name` and returns it.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the record does not exist
    /// - [`AppError::InUse`] while lookup tables reference it
    pub async fn delete(&self, kind: ComponentKind, id_or_name: &str) -> Result<Component, AppError> {
        let existing = self.get(kind, id_or_name).await?;
        self.ensure_unreferenced(&existing, "delete").await?;

        if !self.components.delete(kind, existing.id).await? {
            return Err(AppError::not_found(
                format!("{} not found", kind.label()),
                json!({ "id_or_name": id_or_name }),
            ));
        }
        info!(kind = %kind, id = existing.id, name = %existing.name, "Component deleted");

        self.publisher
            .publish(ChangeEvent::deleted(kind, existing.id))
            .await;
        Ok(existing)
    }

    /// Descriptors of the registered types of `kind`.
    pub fn types(&self, kind: ComponentKind) -> BTreeMap<String, Descriptor> {
        match kind {
            ComponentKind::Cache => self.registries.caches.descriptors(),
            ComponentKind::DataAdapter => self.registries.adapters.descriptors(),
        }
    }

    async fn ensure_unreferenced(&self, component: &Component, action: &str) -> Result<(), AppError> {
        let users = match component.kind {
            ComponentKind::Cache => self.tables.count_by_cache(&component.name).await?,
            ComponentKind::DataAdapter => self.tables.count_by_adapter(&component.name).await?,
        };
        if users > 0 {
            return Err(AppError::in_use(
                format!(
                    "The {} is still in use, cannot {action}.",
                    noun(component.kind)
                ),
                json!({ "name": component.name, "tables": users }),
            ));
        }
        Ok(())
    }
}

fn noun(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::Cache => "cache",
        ComponentKind::DataAdapter => "data adapter",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change_event::{ChangeAction, ChangeKind, MockChangePublisher};
    use crate::domain::repositories::{MockComponentRepository, MockTableRepository};
    use crate::lookup::PluginConfig;
    use chrono::Utc;

    fn memory_config() -> PluginConfig {
        PluginConfig::new("memory").with_field("max_size", 100)
    }

    fn new_cache(name: &str) -> NewComponent {
        NewComponent {
            kind: ComponentKind::Cache,
            name: name.to_string(),
            title: "Memory cache".to_string(),
            description: None,
            config: memory_config(),
        }
    }

    fn stored(id: i64, new: &NewComponent) -> Component {
        Component {
            id,
            kind: new.kind,
            name: new.name.clone(),
            title: new.title.clone(),
            description: new.description.clone(),
            config: new.config.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(
        components: MockComponentRepository,
        tables: MockTableRepository,
        publisher: MockChangePublisher,
    ) -> ComponentService {
        ComponentService::new(
            Arc::new(components),
            Arc::new(tables),
            Arc::new(Registries::builtin()),
            Arc::new(publisher),
        )
    }

    #[tokio::test]
    async fn test_create_publishes_change() {
        let mut components = MockComponentRepository::new();
        components
            .expect_find_by_name()
            .times(1)
            .returning(|_, _| Ok(None));
        components
            .expect_create()
            .times(1)
            .returning(|new| Ok(stored(7, &new)));

        let mut publisher = MockChangePublisher::new();
        publisher
            .expect_publish()
            .withf(|event| {
                event.kind == ChangeKind::Cache
                    && event.action == ChangeAction::Updated
                    && event.ids == vec![7]
            })
            .times(1)
            .returning(|_| ());

        let service = service(components, MockTableRepository::new(), publisher);
        let created = service.create(new_cache("geo-cache")).await.unwrap();

        assert_eq!(created.id, 7);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let mut components = MockComponentRepository::new();
        let existing = stored(1, &new_cache("geo-cache"));
        components
            .expect_find_by_name()
            .returning(move |_, _| Ok(Some(existing.clone())));
        components.expect_create().never();

        let service = service(components, MockTableRepository::new(), MockChangePublisher::new());
        let err = service.create(new_cache("geo-cache")).await.unwrap_err();

        match err {
            AppError::Conflict { details, .. } => {
                assert_eq!(
                    details["errors"]["name"][0],
                    "The cache name is already in use."
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validate_collects_every_field() {
        let components = MockComponentRepository::new();
        let service = service(components, MockTableRepository::new(), MockChangePublisher::new());

        let bad = NewComponent {
            kind: ComponentKind::Cache,
            name: "not valid!".to_string(),
            title: String::new(),
            description: None,
            config: PluginConfig::new("memory").with_field("max_size", 0),
        };
        let errors = service.validate(None, &bad).await.unwrap();

        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("config.max_size"));
    }

    #[tokio::test]
    async fn test_validate_unknown_type() {
        let mut components = MockComponentRepository::new();
        components.expect_find_by_name().returning(|_, _| Ok(None));
        let service = service(components, MockTableRepository::new(), MockChangePublisher::new());

        let mut new = new_cache("geo");
        new.kind = ComponentKind::DataAdapter;
        new.config = PluginConfig::new("carrier-pigeon");
        let errors = service.validate(None, &new).await.unwrap();

        assert!(errors.contains_key("config.type"));
    }

    #[tokio::test]
    async fn test_update_keeps_own_name() {
        let original = new_cache("geo-cache");
        let existing = stored(3, &original);

        let mut components = MockComponentRepository::new();
        let by_id = existing.clone();
        components
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(by_id.clone())));
        let by_name = existing.clone();
        components
            .expect_find_by_name()
            .returning(move |_, _| Ok(Some(by_name.clone())));
        components
            .expect_update()
            .times(1)
            .returning(|id, new| Ok(stored(id, &new)));

        let mut publisher = MockChangePublisher::new();
        publisher.expect_publish().times(1).returning(|_| ());

        let service = service(components, MockTableRepository::new(), publisher);
        let mut changed = original.clone();
        changed.title = "Renamed title".to_string();
        let updated = service.update("3", changed).await.unwrap();

        assert_eq!(updated.title, "Renamed title");
    }

    #[tokio::test]
    async fn test_rename_in_use_rejected() {
        let existing = stored(3, &new_cache("geo-cache"));

        let mut components = MockComponentRepository::new();
        components
            .expect_find_by_name()
            .returning(move |_, name| {
                Ok((name == "geo-cache").then(|| existing.clone()))
            });
        components.expect_update().never();

        let mut tables = MockTableRepository::new();
        tables
            .expect_count_by_cache()
            .withf(|name| name == "geo-cache")
            .returning(|_| Ok(2));

        let service = service(components, tables, MockChangePublisher::new());
        let err = service
            .update("geo-cache", new_cache("geo-cache-v2"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InUse { .. }));
    }

    #[tokio::test]
    async fn test_delete_in_use_rejected() {
        let existing = stored(4, &new_cache("geo-cache"));

        let mut components = MockComponentRepository::new();
        components
            .expect_find_by_id()
            .returning(move |_, _| Ok(Some(existing.clone())));
        components.expect_delete().never();

        let mut tables = MockTableRepository::new();
        tables.expect_count_by_cache().returning(|_| Ok(1));

        let service = service(components, tables, MockChangePublisher::new());
        let err = service.delete(ComponentKind::Cache, "4").await.unwrap_err();

        match err {
            AppError::InUse { message, details } => {
                assert_eq!(message, "The cache is still in use, cannot delete.");
                assert_eq!(details["tables"], 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_publishes_change() {
        let new = NewComponent {
            kind: ComponentKind::DataAdapter,
            ..new_cache("countries")
        };
        let existing = stored(9, &new);

        let mut components = MockComponentRepository::new();
        components
            .expect_find_by_name()
            .returning(move |_, _| Ok(Some(existing.clone())));
        components
            .expect_delete()
            .withf(|kind, id| *kind == ComponentKind::DataAdapter && *id == 9)
            .times(1)
            .returning(|_, _| Ok(true));

        let mut tables = MockTableRepository::new();
        tables.expect_count_by_adapter().returning(|_| Ok(0));

        let mut publisher = MockChangePublisher::new();
        publisher
            .expect_publish()
            .withf(|event| {
                event.kind == ChangeKind::DataAdapter && event.action == ChangeAction::Deleted
            })
            .times(1)
            .returning(|_| ());

        let service = service(components, tables, publisher);
        let deleted = service
            .delete(ComponentKind::DataAdapter, "countries")
            .await
            .unwrap();

        assert_eq!(deleted.id, 9);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let mut components = MockComponentRepository::new();
        components.expect_find_by_name().returning(|_, _| Ok(None));

        let service = service(components, MockTableRepository::new(), MockChangePublisher::new());
        let err = service.get(ComponentKind::Cache, "missing").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[test]
    fn test_types_per_kind() {
        let service = service(
            MockComponentRepository::new(),
            MockTableRepository::new(),
            MockChangePublisher::new(),
        );
        assert!(service.types(ComponentKind::Cache).contains_key("memory"));
        assert!(service.types(ComponentKind::DataAdapter).contains_key("staticmap"));
    }
}
