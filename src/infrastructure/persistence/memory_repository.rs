//! In-process implementation of both configuration repositories.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::BTreeMap;

use crate::domain::entities::{Component, ComponentKind, NewComponent, NewTable, TableDefinition};
use crate::domain::repositories::{ComponentRepository, ListQuery, Page, SortKey, TableRepository};
use crate::error::AppError;

#[derive(Default)]
struct Store {
    next_id: i64,
    components: BTreeMap<i64, Component>,
    tables: BTreeMap<i64, TableDefinition>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn component_name_taken(&self, kind: ComponentKind, name: &str, except: Option<i64>) -> bool {
        self.components
            .values()
            .any(|c| c.kind == kind && c.name == name && Some(c.id) != except)
    }

    fn table_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.tables
            .values()
            .any(|t| t.name == name && Some(t.id) != except)
    }
}

fn unique_violation(constraint: &str) -> AppError {
    AppError::conflict(
        "Unique constraint violation",
        json!({ "constraint": constraint }),
    )
}

/// Non-persistent storage for single-node deployments and tests.
///
/// Ids are shared between components and tables, as with the sequences of
/// the PostgreSQL schema they never repeat within a process.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComponentRepository for InMemoryRepository {
    async fn create(&self, new: NewComponent) -> Result<Component, AppError> {
        let mut store = self.store.write();
        if store.component_name_taken(new.kind, &new.name, None) {
            return Err(unique_violation("lookup_components_kind_name_key"));
        }

        let now = Utc::now();
        let component = Component {
            id: store.next_id(),
            kind: new.kind,
            name: new.name,
            title: new.title,
            description: new.description,
            config: new.config,
            created_at: now,
            updated_at: now,
        };
        store.components.insert(component.id, component.clone());
        Ok(component)
    }

    async fn update(&self, id: i64, update: NewComponent) -> Result<Component, AppError> {
        let mut store = self.store.write();
        if store.component_name_taken(update.kind, &update.name, Some(id)) {
            return Err(unique_violation("lookup_components_kind_name_key"));
        }

        let component = store
            .components
            .get_mut(&id)
            .filter(|c| c.kind == update.kind)
            .ok_or_else(|| {
                AppError::not_found(
                    format!("{} not found", update.kind.label()),
                    json!({ "id": id }),
                )
            })?;

        component.name = update.name;
        component.title = update.title;
        component.description = update.description;
        component.config = update.config;
        component.updated_at = Utc::now();
        Ok(component.clone())
    }

    async fn find_by_id(
        &self,
        kind: ComponentKind,
        id: i64,
    ) -> Result<Option<Component>, AppError> {
        Ok(self
            .store
            .read()
            .components
            .get(&id)
            .filter(|c| c.kind == kind)
            .cloned())
    }

    async fn find_by_name(
        &self,
        kind: ComponentKind,
        name: &str,
    ) -> Result<Option<Component>, AppError> {
        Ok(self
            .store
            .read()
            .components
            .values()
            .find(|c| c.kind == kind && c.name == name)
            .cloned())
    }

    async fn find_by_names(
        &self,
        kind: ComponentKind,
        names: &[String],
    ) -> Result<Vec<Component>, AppError> {
        let mut found: Vec<Component> = self
            .store
            .read()
            .components
            .values()
            .filter(|c| c.kind == kind && names.contains(&c.name))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn list(
        &self,
        kind: ComponentKind,
        query: &ListQuery,
    ) -> Result<Page<Component>, AppError> {
        let matching: Vec<Component> = self
            .store
            .read()
            .components
            .values()
            .filter(|c| c.kind == kind)
            .filter(|c| query.matches(&c.name, &c.title, c.description.as_deref()))
            .cloned()
            .collect();

        Ok(query.apply(matching, |c| SortKey {
            id: c.id,
            name: &c.name,
            title: &c.title,
            description: c.description.as_deref(),
        }))
    }

    async fn list_all(&self, kind: ComponentKind) -> Result<Vec<Component>, AppError> {
        Ok(self
            .store
            .read()
            .components
            .values()
            .filter(|c| c.kind == kind)
            .cloned()
            .collect())
    }

    async fn delete(&self, kind: ComponentKind, id: i64) -> Result<bool, AppError> {
        let mut store = self.store.write();
        let matches = store.components.get(&id).is_some_and(|c| c.kind == kind);
        if matches {
            store.components.remove(&id);
        }
        Ok(matches)
    }
}

#[async_trait]
impl TableRepository for InMemoryRepository {
    async fn create(&self, new: NewTable) -> Result<TableDefinition, AppError> {
        let mut store = self.store.write();
        if store.table_name_taken(&new.name, None) {
            return Err(unique_violation("lookup_tables_name_key"));
        }

        let now = Utc::now();
        let table = TableDefinition {
            id: store.next_id(),
            name: new.name,
            title: new.title,
            description: new.description,
            cache_name: new.cache_name,
            data_adapter_name: new.data_adapter_name,
            default_single_value: new.default_single_value,
            default_multi_value: new.default_multi_value,
            created_at: now,
            updated_at: now,
        };
        store.tables.insert(table.id, table.clone());
        Ok(table)
    }

    async fn update(&self, id: i64, update: NewTable) -> Result<TableDefinition, AppError> {
        let mut store = self.store.write();
        if store.table_name_taken(&update.name, Some(id)) {
            return Err(unique_violation("lookup_tables_name_key"));
        }

        let table = store
            .tables
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Lookup table not found", json!({ "id": id })))?;

        table.name = update.name;
        table.title = update.title;
        table.description = update.description;
        table.cache_name = update.cache_name;
        table.data_adapter_name = update.data_adapter_name;
        table.default_single_value = update.default_single_value;
        table.default_multi_value = update.default_multi_value;
        table.updated_at = Utc::now();
        Ok(table.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TableDefinition>, AppError> {
        Ok(self.store.read().tables.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<TableDefinition>, AppError> {
        Ok(self
            .store
            .read()
            .tables
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<TableDefinition>, AppError> {
        let matching: Vec<TableDefinition> = self
            .store
            .read()
            .tables
            .values()
            .filter(|t| query.matches(&t.name, &t.title, t.description.as_deref()))
            .cloned()
            .collect();

        Ok(query.apply(matching, |t| SortKey {
            id: t.id,
            name: &t.name,
            title: &t.title,
            description: t.description.as_deref(),
        }))
    }

    async fn list_all(&self) -> Result<Vec<TableDefinition>, AppError> {
        Ok(self.store.read().tables.values().cloned().collect())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.store.write().tables.remove(&id).is_some())
    }

    async fn count_by_cache(&self, cache_name: &str) -> Result<i64, AppError> {
        Ok(self
            .store
            .read()
            .tables
            .values()
            .filter(|t| t.cache_name == cache_name)
            .count() as i64)
    }

    async fn count_by_adapter(&self, adapter_name: &str) -> Result<i64, AppError> {
        Ok(self
            .store
            .read()
            .tables
            .values()
            .filter(|t| t.data_adapter_name == adapter_name)
            .count() as i64)
    }
}
