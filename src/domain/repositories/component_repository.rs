//! Repository trait for cache and data adapter configuration records.

use crate::domain::entities::{Component, ComponentKind, NewComponent};
use crate::domain::repositories::{ListQuery, Page};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for cache and data adapter configurations.
///
/// Both kinds share one store; every operation is scoped to a [`ComponentKind`]
/// so an id or name never resolves across kinds.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgComponentRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::InMemoryRepository`] - single-node, non-persistent
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComponentRepository: Send + Sync {
    /// Stores a new configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the name is already taken within the kind.
    async fn create(&self, new: NewComponent) -> Result<Component, AppError>;

    /// Replaces name, title, description and configuration of record `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no such record exists,
    /// [`AppError::Conflict`] if the new name is taken by another record.
    async fn update(&self, id: i64, update: NewComponent) -> Result<Component, AppError>;

    async fn find_by_id(&self, kind: ComponentKind, id: i64)
    -> Result<Option<Component>, AppError>;

    async fn find_by_name(
        &self,
        kind: ComponentKind,
        name: &str,
    ) -> Result<Option<Component>, AppError>;

    /// Records whose name is in `names`; unknown names are skipped.
    async fn find_by_names(
        &self,
        kind: ComponentKind,
        names: &[String],
    ) -> Result<Vec<Component>, AppError>;

    /// One page of records, filtered and sorted per `query`.
    async fn list(&self, kind: ComponentKind, query: &ListQuery)
    -> Result<Page<Component>, AppError>;

    /// Every record of the kind, used to materialize live instances.
    async fn list_all(&self, kind: ComponentKind) -> Result<Vec<Component>, AppError>;

    /// Deletes record `id`. Returns `Ok(false)` if it did not exist.
    async fn delete(&self, kind: ComponentKind, id: i64) -> Result<bool, AppError>;
}
