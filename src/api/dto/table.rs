//! DTOs for lookup table endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::api::dto::component::ComponentResponse;
use crate::api::dto::pagination::PageMeta;
use crate::domain::entities::{NewTable, TableDefinition};

#[derive(Debug, Deserialize)]
pub struct TableRequest {
    /// Only read by the validate endpoint: the table being edited.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub cache_name: String,
    pub data_adapter_name: String,
    #[serde(default)]
    pub default_single_value: Option<Value>,
    #[serde(default)]
    pub default_multi_value: Option<Map<String, Value>>,
}

impl From<TableRequest> for NewTable {
    fn from(r: TableRequest) -> Self {
        Self {
            name: r.name,
            title: r.title,
            description: r.description,
            cache_name: r.cache_name,
            data_adapter_name: r.data_adapter_name,
            // An explicit JSON null means "no default".
            default_single_value: r.default_single_value.filter(|v| !v.is_null()),
            default_multi_value: r.default_multi_value,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub cache_name: String,
    pub data_adapter_name: String,
    pub default_single_value: Option<Value>,
    pub default_multi_value: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TableDefinition> for TableResponse {
    fn from(t: TableDefinition) -> Self {
        Self {
            id: t.id,
            name: t.name,
            title: t.title,
            description: t.description,
            cache_name: t.cache_name,
            data_adapter_name: t.data_adapter_name,
            default_single_value: t.default_single_value,
            default_multi_value: t.default_multi_value,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Table listing; `caches` and `data_adapters` are present with `resolve=true`.
#[derive(Debug, Serialize)]
pub struct TableListResponse {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub lookup_tables: Vec<TableResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caches: Option<BTreeMap<i64, ComponentResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_adapters: Option<BTreeMap<i64, ComponentResponse>>,
}
