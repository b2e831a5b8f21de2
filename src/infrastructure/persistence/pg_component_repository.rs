//! PostgreSQL implementation of the component repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use sqlx::types::Json;
use std::sync::Arc;

use crate::domain::entities::{Component, ComponentKind, NewComponent};
use crate::domain::repositories::{ComponentRepository, ListQuery, Page};
use crate::error::AppError;
use crate::lookup::PluginConfig;

const COLUMNS: &str = "id, kind, name, title, description, config, created_at, updated_at";

/// PostgreSQL repository for cache and data adapter configurations.
///
/// Both kinds live in `lookup_components`; `(kind, name)` is unique.
pub struct PgComponentRepository {
    pool: Arc<PgPool>,
}

impl PgComponentRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ComponentRow {
    id: i64,
    kind: String,
    name: String,
    title: String,
    description: Option<String>,
    config: Json<PluginConfig>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ComponentRow> for Component {
    type Error = AppError;

    fn try_from(row: ComponentRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<ComponentKind>()
            .map_err(|e| AppError::internal("Corrupt component record", json!({ "error": e })))?;

        Ok(Component {
            id: row.id,
            kind,
            name: row.name,
            title: row.title,
            description: row.description,
            config: row.config.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(rows: Vec<ComponentRow>) -> Result<Vec<Component>, AppError> {
    rows.into_iter().map(Component::try_from).collect()
}

#[async_trait]
impl ComponentRepository for PgComponentRepository {
    async fn create(&self, new: NewComponent) -> Result<Component, AppError> {
        let sql = format!(
            "INSERT INTO lookup_components (kind, name, title, description, config)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let row: ComponentRow = sqlx::query_as(&sql)
            .bind(new.kind.as_str())
            .bind(&new.name)
            .bind(&new.title)
            .bind(&new.description)
            .bind(Json(&new.config))
            .fetch_one(self.pool.as_ref())
            .await?;

        row.try_into()
    }

    async fn update(&self, id: i64, update: NewComponent) -> Result<Component, AppError> {
        let sql = format!(
            "UPDATE lookup_components SET
                name        = $3,
                title       = $4,
                description = $5,
                config      = $6,
                updated_at  = NOW()
             WHERE id = $1 AND kind = $2
             RETURNING {COLUMNS}"
        );
        let row: Option<ComponentRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(update.kind.as_str())
            .bind(&update.name)
            .bind(&update.title)
            .bind(&update.description)
            .bind(Json(&update.config))
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.ok_or_else(|| {
            AppError::not_found(
                format!("{} not found", update.kind.label()),
                json!({ "id": id }),
            )
        })?
        .try_into()
    }

    async fn find_by_id(
        &self,
        kind: ComponentKind,
        id: i64,
    ) -> Result<Option<Component>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM lookup_components WHERE kind = $1 AND id = $2");
        let row: Option<ComponentRow> = sqlx::query_as(&sql)
            .bind(kind.as_str())
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(Component::try_from).transpose()
    }

    async fn find_by_name(
        &self,
        kind: ComponentKind,
        name: &str,
    ) -> Result<Option<Component>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM lookup_components WHERE kind = $1 AND name = $2");
        let row: Option<ComponentRow> = sqlx::query_as(&sql)
            .bind(kind.as_str())
            .bind(name)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(Component::try_from).transpose()
    }

    async fn find_by_names(
        &self,
        kind: ComponentKind,
        names: &[String],
    ) -> Result<Vec<Component>, AppError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM lookup_components WHERE kind = $1 AND name = ANY($2) ORDER BY name"
        );
        let rows: Vec<ComponentRow> = sqlx::query_as(&sql)
            .bind(kind.as_str())
            .bind(names)
            .fetch_all(self.pool.as_ref())
            .await?;

        collect(rows)
    }

    async fn list(
        &self,
        kind: ComponentKind,
        query: &ListQuery,
    ) -> Result<Page<Component>, AppError> {
        // Sort column and direction come from closed enums, never from input text.
        let filter = "kind = $1
            AND ($2::TEXT IS NULL OR name ILIKE $2 OR title ILIKE $2 OR description ILIKE $2)";
        let pattern = query.like_pattern();

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM lookup_components WHERE {filter}"))
                .bind(kind.as_str())
                .bind(&pattern)
                .fetch_one(self.pool.as_ref())
                .await?;

        let sql = format!(
            "SELECT {COLUMNS} FROM lookup_components WHERE {filter}
             ORDER BY {column} {order}, id {order}
             LIMIT $3 OFFSET $4",
            column = query.sort.column(),
            order = query.order.sql(),
        );
        let rows: Vec<ComponentRow> = sqlx::query_as(&sql)
            .bind(kind.as_str())
            .bind(&pattern)
            .bind(query.per_page)
            .bind(query.offset())
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(Page {
            items: collect(rows)?,
            total,
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn list_all(&self, kind: ComponentKind) -> Result<Vec<Component>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM lookup_components WHERE kind = $1 ORDER BY id");
        let rows: Vec<ComponentRow> = sqlx::query_as(&sql)
            .bind(kind.as_str())
            .fetch_all(self.pool.as_ref())
            .await?;

        collect(rows)
    }

    async fn delete(&self, kind: ComponentKind, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM lookup_components WHERE kind = $1 AND id = $2")
            .bind(kind.as_str())
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
