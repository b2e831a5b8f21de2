//! Repository trait for lookup table configuration records.

use crate::domain::entities::{NewTable, TableDefinition};
use crate::domain::repositories::{ListQuery, Page};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for lookup table configurations.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgTableRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryRepository`] - single-node, non-persistent
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableRepository: Send + Sync {
    /// Stores a new table.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the name is already taken.
    async fn create(&self, new: NewTable) -> Result<TableDefinition, AppError>;

    /// Replaces every field of table `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no such table exists,
    /// [`AppError::Conflict`] if the new name is taken by another table.
    async fn update(&self, id: i64, update: NewTable) -> Result<TableDefinition, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<TableDefinition>, AppError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<TableDefinition>, AppError>;

    async fn list(&self, query: &ListQuery) -> Result<Page<TableDefinition>, AppError>;

    async fn list_all(&self) -> Result<Vec<TableDefinition>, AppError>;

    /// Deletes table `id`. Returns `Ok(false)` if it did not exist.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Number of tables using the named cache.
    async fn count_by_cache(&self, cache_name: &str) -> Result<i64, AppError>;

    /// Number of tables using the named data adapter.
    async fn count_by_adapter(&self, adapter_name: &str) -> Result<i64, AppError>;
}
