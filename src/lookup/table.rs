//! Lookup table view: resolves a key through the table's cache and adapter.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::domain::entities::TableDefinition;
use crate::lookup::adapter::LookupDataAdapter;
use crate::lookup::cache::{LookupCache, loader};
use crate::lookup::error::LookupError;
use crate::lookup::key::LookupKey;
use crate::lookup::result::LookupResult;
use crate::lookup::service::LookupService;

/// Live wiring of a table: the names it references plus its defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBinding {
    pub id: i64,
    pub name: String,
    pub cache_name: String,
    pub adapter_name: String,
    pub default_single_value: Option<Value>,
    pub default_multi_value: Option<Map<String, Value>>,
}

impl TableBinding {
    /// Substitutes the table defaults for an empty result.
    pub fn apply_defaults(&self, result: LookupResult) -> LookupResult {
        if result.has_result()
            || (self.default_single_value.is_none() && self.default_multi_value.is_none())
        {
            return result;
        }
        LookupResult::from_parts(
            self.default_single_value.clone(),
            self.default_multi_value.clone(),
        )
    }
}

impl From<&TableDefinition> for TableBinding {
    fn from(table: &TableDefinition) -> Self {
        Self {
            id: table.id,
            name: table.name.clone(),
            cache_name: table.cache_name.clone(),
            adapter_name: table.data_adapter_name.clone(),
            default_single_value: table.default_single_value.clone(),
            default_multi_value: table.default_multi_value.clone(),
        }
    }
}

/// Builder returned by [`LookupService::new_builder`].
pub struct LookupTableBuilder<'a> {
    service: &'a LookupService,
    name: Option<String>,
}

impl<'a> LookupTableBuilder<'a> {
    pub(crate) fn new(service: &'a LookupService) -> Self {
        Self {
            service,
            name: None,
        }
    }

    pub fn lookup_table(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the table view. Performs no I/O and does not check that the
    /// table exists; that is decided on every lookup.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotConfigured`] if no table name was given.
    pub fn build(self) -> Result<LookupTable<'a>, LookupError> {
        let name = self
            .name
            .ok_or_else(|| LookupError::NotConfigured("lookup table (no name given)".into()))?;
        Ok(LookupTable {
            service: self.service,
            name,
        })
    }
}

/// A named table view.
///
/// Holds only the table name. The binding and the live cache and adapter are
/// dereferenced on every [`lookup`](Self::lookup), so reconfiguration takes
/// effect on the next call.
pub struct LookupTable<'a> {
    service: &'a LookupService,
    name: String,
}

impl LookupTable<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves `key` through the table's cache, loading from its adapter on a miss.
    ///
    /// A call that raced a reconfiguration can hold a cache or adapter that
    /// was swapped out and stopped underneath it. Such a call is retried once
    /// against the instances now live under the same names.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotConfigured`] if the table, its cache or its
    /// adapter has no live instance. Cache and adapter failures are returned
    /// unchanged.
    pub async fn lookup(&self, key: &LookupKey) -> Result<LookupResult, LookupError> {
        let wiring = self.resolve()?;
        match wiring.lookup(key).await {
            Err(LookupError::NotRunning { name, state }) => {
                let current = self.resolve()?;
                if current.same_instances(&wiring) {
                    return Err(LookupError::NotRunning { name, state });
                }
                debug!(table = %self.name, stopped = %name, "Retrying lookup on replaced instances");
                current.lookup(key).await
            }
            other => other,
        }
    }

    fn resolve(&self) -> Result<Wiring, LookupError> {
        let binding = self.service.table(&self.name).ok_or_else(|| {
            LookupError::NotConfigured(format!("lookup table '{}'", self.name))
        })?;
        let cache = self.service.cache(&binding.cache_name).ok_or_else(|| {
            LookupError::NotConfigured(format!(
                "cache '{}' of lookup table '{}'",
                binding.cache_name, self.name
            ))
        })?;
        let adapter = self.service.data_adapter(&binding.adapter_name).ok_or_else(|| {
            LookupError::NotConfigured(format!(
                "data adapter '{}' of lookup table '{}'",
                binding.adapter_name, self.name
            ))
        })?;
        Ok(Wiring {
            binding,
            cache,
            adapter,
        })
    }

    /// Resolves `key` and returns only its single value.
    pub async fn single_value(&self, key: &LookupKey) -> Result<Option<Value>, LookupError> {
        Ok(self.lookup(key).await?.single_value().cloned())
    }
}

/// Instances a single lookup runs against.
struct Wiring {
    binding: Arc<TableBinding>,
    cache: Arc<dyn LookupCache>,
    adapter: Arc<dyn LookupDataAdapter>,
}

impl Wiring {
    async fn lookup(&self, key: &LookupKey) -> Result<LookupResult, LookupError> {
        let adapter = Arc::clone(&self.adapter);
        let fetch_key = key.clone();
        let fetch = loader(async move { adapter.get(&fetch_key).await });
        let result = self.cache.get(key, fetch).await?;

        Ok(self.binding.apply_defaults(result))
    }

    fn same_instances(&self, other: &Wiring) -> bool {
        Arc::ptr_eq(&self.cache, &other.cache) && Arc::ptr_eq(&self.adapter, &other.adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding(single: Option<Value>, multi: Option<Map<String, Value>>) -> TableBinding {
        TableBinding {
            id: 1,
            name: "geo".into(),
            cache_name: "c".into(),
            adapter_name: "a".into(),
            default_single_value: single,
            default_multi_value: multi,
        }
    }

    #[test]
    fn test_defaults_fill_empty_results_only() {
        let with_default = binding(Some(json!("unknown")), None);

        let empty = with_default.apply_defaults(LookupResult::empty());
        assert!(empty.has_result());
        assert_eq!(empty.single_value(), Some(&json!("unknown")));

        let hit = with_default.apply_defaults(LookupResult::single("DE"));
        assert_eq!(hit.single_value(), Some(&json!("DE")));
    }

    #[test]
    fn test_no_defaults_keeps_not_found() {
        let plain = binding(None, None);
        assert!(plain.apply_defaults(LookupResult::empty()).is_empty());
    }
}
