//! Management of lookup table configurations.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::application::services::validation::{
    IdOrName, add_error, check_name, check_title, ensure_storable,
};
use crate::domain::change_event::{ChangeEvent, ChangeKind, ChangePublisher};
use crate::domain::entities::{ComponentKind, NewTable, TableDefinition};
use crate::domain::repositories::{ComponentRepository, ListQuery, Page, TableRepository};
use crate::error::AppError;
use crate::lookup::FieldErrors;

/// Service for lookup table configurations.
///
/// A table references its cache and data adapter by name. Both records must
/// exist when the table is stored; whether their live instances are up is
/// only decided at lookup time.
pub struct TableService {
    tables: Arc<dyn TableRepository>,
    components: Arc<dyn ComponentRepository>,
    publisher: Arc<dyn ChangePublisher>,
}

impl TableService {
    pub fn new(
        tables: Arc<dyn TableRepository>,
        components: Arc<dyn ComponentRepository>,
        publisher: Arc<dyn ChangePublisher>,
    ) -> Self {
        Self {
            tables,
            components,
            publisher,
        }
    }

    /// Validates a submitted table without storing it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if a repository check fails.
    pub async fn validate(&self, id: Option<i64>, new: &NewTable) -> Result<FieldErrors, AppError> {
        Ok(self.check(id, new).await?.0)
    }

    async fn check(&self, id: Option<i64>, new: &NewTable) -> Result<(FieldErrors, bool), AppError> {
        let mut errors = FieldErrors::new();
        let mut name_taken = false;

        check_name(&mut errors, &new.name);
        if !errors.contains_key("name") {
            if let Some(existing) = self.tables.find_by_name(&new.name).await? {
                if Some(existing.id) != id {
                    name_taken = true;
                    add_error(
                        &mut errors,
                        "name",
                        "The lookup table name is already in use.",
                    );
                }
            }
        }
        check_title(&mut errors, &new.title);

        self.check_reference(&mut errors, ComponentKind::Cache, "cache_name", &new.cache_name)
            .await?;
        self.check_reference(
            &mut errors,
            ComponentKind::DataAdapter,
            "data_adapter_name",
            &new.data_adapter_name,
        )
        .await?;

        if matches!(new.default_single_value, Some(ref v) if v.is_array() || v.is_object()) {
            add_error(
                &mut errors,
                "default_single_value",
                "Default single value must be a string, number or boolean.",
            );
        }

        Ok((errors, name_taken))
    }

    async fn check_reference(
        &self,
        errors: &mut FieldErrors,
        kind: ComponentKind,
        field: &str,
        name: &str,
    ) -> Result<(), AppError> {
        if name.is_empty() {
            add_error(errors, field, format!("{} is required.", kind.label()));
        } else if self.components.find_by_name(kind, name).await?.is_none() {
            add_error(
                errors,
                field,
                format!("{} '{name}' does not exist.", kind.label()),
            );
        }
        Ok(())
    }

    /// Creates a new lookup table.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the input is invalid or references
    /// an unknown cache or adapter, [`AppError::Conflict`] if the name is
    /// already in use.
    pub async fn create(&self, new: NewTable) -> Result<TableDefinition, AppError> {
        let (errors, name_taken) = self.check(None, &new).await?;
        ensure_storable(errors, name_taken)?;

        let created = self.tables.create(new).await?;
        info!(id = created.id, name = %created.name, "Lookup table created");

        self.publisher
            .publish(ChangeEvent::updated(ChangeKind::Table, created.id))
            .await;
        Ok(created)
    }

    /// Replaces the table addressed by `id_or_name`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the table does not exist,
    /// [`AppError::Validation`] if the input is invalid, [`AppError::Conflict`]
    /// if the new name belongs to another table.
    pub async fn update(&self, id_or_name: &str, new: NewTable) -> Result<TableDefinition, AppError> {
        let existing = self.get(id_or_name).await?;
        let (errors, name_taken) = self.check(Some(existing.id), &new).await?;
        ensure_storable(errors, name_taken)?;

        let updated = self.tables.update(existing.id, new).await?;
        info!(id = updated.id, name = %updated.name, "Lookup table updated");

        self.publisher
            .publish(ChangeEvent::updated(ChangeKind::Table, updated.id))
            .await;
        Ok(updated)
    }

    /// Finds a table by numeric id or by name.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no table matches.
    pub async fn get(&self, id_or_name: &str) -> Result<TableDefinition, AppError> {
        let found = match IdOrName::parse(id_or_name) {
            IdOrName::Id(id) => self.tables.find_by_id(id).await?,
            IdOrName::Name(name) => self.tables.find_by_name(name).await?,
        };
        found.ok_or_else(|| {
            AppError::not_found(
                "Lookup table not found",
                json!({ "id_or_name": id_or_name }),
            )
        })
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<TableDefinition>, AppError> {
        self.tables.list(query).await
    }

    /// Deletes the table addressed by `id_or_name` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the table does not exist.
    pub async fn delete(&self, id_or_name: &str) -> Result<TableDefinition, AppError> {
        let existing = self.get(id_or_name).await?;

        if !self.tables.delete(existing.id).await? {
            return Err(AppError::not_found(
                "Lookup table not found",
                json!({ "id_or_name": id_or_name }),
            ));
        }
        info!(id = existing.id, name = %existing.name, "Lookup table deleted");

        self.publisher
            .publish(ChangeEvent::deleted(ChangeKind::Table, existing.id))
            .await;
        Ok(existing)
    }
}
