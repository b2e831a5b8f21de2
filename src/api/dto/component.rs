//! DTOs for cache and data adapter endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::dto::pagination::PageMeta;
use crate::domain::entities::{Component, ComponentKind, NewComponent};
use crate::lookup::PluginConfig;

/// Create, update and validate request body.
///
/// `config` is the type-tagged configuration: `{"type": "memory", ...}`.
#[derive(Debug, Deserialize)]
pub struct ComponentRequest {
    /// Only read by the validate endpoints: the record being edited.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub config: PluginConfig,
}

impl ComponentRequest {
    pub fn into_new(self, kind: ComponentKind) -> NewComponent {
        NewComponent {
            kind,
            name: self.name,
            title: self.title,
            description: self.description,
            config: self.config,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ComponentResponse {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub config: PluginConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Component> for ComponentResponse {
    fn from(c: Component) -> Self {
        Self {
            id: c.id,
            name: c.name,
            title: c.title,
            description: c.description,
            config: c.config,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CacheListResponse {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub caches: Vec<ComponentResponse>,
}

#[derive(Debug, Serialize)]
pub struct AdapterListResponse {
    #[serde(flatten)]
    pub meta: PageMeta,
    pub data_adapters: Vec<ComponentResponse>,
}
