//! Lookup table configuration record.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A stored lookup table: binds a cache and a data adapter by name.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub cache_name: String,
    pub data_adapter_name: String,
    /// Returned as the single value when the adapter has no result.
    pub default_single_value: Option<Value>,
    /// Returned as the multi value when the adapter has no result.
    pub default_multi_value: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TableDefinition {
    /// Returns true if the table references the named cache or adapter.
    pub fn references(&self, cache_name: Option<&str>, adapter_name: Option<&str>) -> bool {
        cache_name.is_some_and(|n| n == self.cache_name)
            || adapter_name.is_some_and(|n| n == self.data_adapter_name)
    }
}

/// Input data for creating or replacing a table.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTable {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub cache_name: String,
    pub data_adapter_name: String,
    pub default_single_value: Option<Value>,
    pub default_multi_value: Option<Map<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_references() {
        let now = Utc::now();
        let table = TableDefinition {
            id: 1,
            name: "geo".into(),
            title: "Geo".into(),
            description: None,
            cache_name: "geo-cache".into(),
            data_adapter_name: "geo-db".into(),
            default_single_value: None,
            default_multi_value: None,
            created_at: now,
            updated_at: now,
        };

        assert!(table.references(Some("geo-cache"), None));
        assert!(table.references(None, Some("geo-db")));
        assert!(!table.references(Some("geo-db"), Some("geo-cache")));
        assert!(!table.references(None, None));
    }
}
