//! DTOs for query, purge, error state and validation endpoints.

use serde::{Deserialize, Serialize};

use crate::lookup::{FieldErrors, LookupKey};

/// `?key=K` on the query endpoints.
#[derive(Debug, Deserialize)]
pub struct KeyParams {
    pub key: String,
}

impl KeyParams {
    pub fn lookup_key(&self) -> LookupKey {
        LookupKey::new(self.key.clone())
    }
}

/// `?key=K` on the purge endpoint; without it the whole cache is purged.
#[derive(Debug, Default, Deserialize)]
pub struct PurgeParams {
    #[serde(default)]
    pub key: Option<String>,
}

/// Names whose error states are requested.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorStatesRequest {
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub data_adapters: Vec<String>,
    #[serde(default)]
    pub caches: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub failed: bool,
    pub errors: FieldErrors,
}

impl From<FieldErrors> for ValidationResponse {
    fn from(errors: FieldErrors) -> Self {
        Self {
            failed: !errors.is_empty(),
            errors,
        }
    }
}
