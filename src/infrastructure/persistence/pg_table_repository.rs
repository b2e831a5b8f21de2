//! PostgreSQL implementation of the table repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use sqlx::PgPool;
use sqlx::types::Json;
use std::sync::Arc;

use crate::domain::entities::{NewTable, TableDefinition};
use crate::domain::repositories::{ListQuery, Page, TableRepository};
use crate::error::AppError;

const COLUMNS: &str = "id, name, title, description, cache_name, data_adapter_name, \
     default_single_value, default_multi_value, created_at, updated_at";

/// PostgreSQL repository for lookup table configurations.
pub struct PgTableRepository {
    pool: Arc<PgPool>,
}

impl PgTableRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TableRow {
    id: i64,
    name: String,
    title: String,
    description: Option<String>,
    cache_name: String,
    data_adapter_name: String,
    default_single_value: Option<Json<Value>>,
    default_multi_value: Option<Json<Map<String, Value>>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TableRow> for TableDefinition {
    fn from(row: TableRow) -> Self {
        TableDefinition {
            id: row.id,
            name: row.name,
            title: row.title,
            description: row.description,
            cache_name: row.cache_name,
            data_adapter_name: row.data_adapter_name,
            default_single_value: row.default_single_value.map(|v| v.0),
            default_multi_value: row.default_multi_value.map(|v| v.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl TableRepository for PgTableRepository {
    async fn create(&self, new: NewTable) -> Result<TableDefinition, AppError> {
        let sql = format!(
            "INSERT INTO lookup_tables
                (name, title, description, cache_name, data_adapter_name,
                 default_single_value, default_multi_value)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        let row: TableRow = sqlx::query_as(&sql)
            .bind(&new.name)
            .bind(&new.title)
            .bind(&new.description)
            .bind(&new.cache_name)
            .bind(&new.data_adapter_name)
            .bind(new.default_single_value.as_ref().map(Json))
            .bind(new.default_multi_value.as_ref().map(Json))
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(row.into())
    }

    async fn update(&self, id: i64, update: NewTable) -> Result<TableDefinition, AppError> {
        let sql = format!(
            "UPDATE lookup_tables SET
                name                 = $2,
                title                = $3,
                description          = $4,
                cache_name           = $5,
                data_adapter_name    = $6,
                default_single_value = $7,
                default_multi_value  = $8,
                updated_at           = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row: Option<TableRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(&update.title)
            .bind(&update.description)
            .bind(&update.cache_name)
            .bind(&update.data_adapter_name)
            .bind(update.default_single_value.as_ref().map(Json))
            .bind(update.default_multi_value.as_ref().map(Json))
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.map(TableDefinition::from)
            .ok_or_else(|| AppError::not_found("Lookup table not found", json!({ "id": id })))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TableDefinition>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM lookup_tables WHERE id = $1");
        let row: Option<TableRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(TableDefinition::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<TableDefinition>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM lookup_tables WHERE name = $1");
        let row: Option<TableRow> = sqlx::query_as(&sql)
            .bind(name)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(TableDefinition::from))
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<TableDefinition>, AppError> {
        let filter =
            "($1::TEXT IS NULL OR name ILIKE $1 OR title ILIKE $1 OR description ILIKE $1)";
        let pattern = query.like_pattern();

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM lookup_tables WHERE {filter}"))
                .bind(&pattern)
                .fetch_one(self.pool.as_ref())
                .await?;

        let sql = format!(
            "SELECT {COLUMNS} FROM lookup_tables WHERE {filter}
             ORDER BY {column} {order}, id {order}
             LIMIT $2 OFFSET $3",
            column = query.sort.column(),
            order = query.order.sql(),
        );
        let rows: Vec<TableRow> = sqlx::query_as(&sql)
            .bind(&pattern)
            .bind(query.per_page)
            .bind(query.offset())
            .fetch_all(self.pool.as_ref())
            .await?;

        Ok(Page {
            items: rows.into_iter().map(TableDefinition::from).collect(),
            total,
            page: query.page,
            per_page: query.per_page,
        })
    }

    async fn list_all(&self) -> Result<Vec<TableDefinition>, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM lookup_tables ORDER BY id");
        let rows: Vec<TableRow> = sqlx::query_as(&sql).fetch_all(self.pool.as_ref()).await?;

        Ok(rows.into_iter().map(TableDefinition::from).collect())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM lookup_tables WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_by_cache(&self, cache_name: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM lookup_tables WHERE cache_name = $1")
            .bind(cache_name)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn count_by_adapter(&self, adapter_name: &str) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM lookup_tables WHERE data_adapter_name = $1")
                .bind(adapter_name)
                .fetch_one(self.pool.as_ref())
                .await?;

        Ok(count)
    }
}
