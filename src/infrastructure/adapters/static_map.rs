//! Adapter answering from a fixed map stored in its configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use validator::{Validate, ValidationError};

use crate::lookup::{
    ComponentCore, Descriptor, FieldErrors, Lifecycle, LookupDataAdapter, LookupError, LookupKey,
    LookupResult, PluginConfig, PluginFactory, validate_settings,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct StaticMapSettings {
    /// Scalars resolve to a single value, objects to a multi value.
    #[validate(custom(function = "validate_entries"))]
    pub entries: BTreeMap<String, Value>,
    pub case_insensitive: bool,
}

fn validate_entries(entries: &BTreeMap<String, Value>) -> Result<(), ValidationError> {
    let invalid = |message: String| {
        let mut error = ValidationError::new("entries");
        error.message = Some(message.into());
        Err(error)
    };

    for (key, value) in entries {
        if key.is_empty() {
            return invalid("keys must not be empty".to_string());
        }
        if matches!(value, Value::Null | Value::Array(_)) {
            return invalid(format!("value of '{key}' must be a scalar or an object"));
        }
    }
    Ok(())
}

/// Resolves keys from an in-configuration map.
///
/// Missing keys are an authoritative "not found", never an error.
pub struct StaticMapAdapter {
    core: ComponentCore,
    entries: HashMap<String, Value>,
    case_insensitive: bool,
}

impl StaticMapAdapter {
    pub const TYPE_NAME: &'static str = "staticmap";

    pub fn new(id: i64, name: &str, config: PluginConfig, settings: StaticMapSettings) -> Self {
        let case_insensitive = settings.case_insensitive;
        let entries = settings
            .entries
            .into_iter()
            .map(|(key, value)| {
                let key = if case_insensitive { key.to_lowercase() } else { key };
                (key, value)
            })
            .collect();

        Self {
            core: ComponentCore::new(id, name, config),
            entries,
            case_insensitive,
        }
    }

    fn resolve(&self, key: &str) -> LookupResult {
        let found = if self.case_insensitive {
            self.entries.get(&key.to_lowercase())
        } else {
            self.entries.get(key)
        };

        match found {
            None => LookupResult::empty(),
            Some(Value::Object(values)) => match values.get("value") {
                Some(single) => LookupResult::single_and_multi(single.clone(), values.clone()),
                None => LookupResult::multi(values.clone()),
            },
            Some(value) => LookupResult::single(value.clone()),
        }
    }
}

#[async_trait]
impl Lifecycle for StaticMapAdapter {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    async fn start(&self) -> Result<(), LookupError> {
        self.core.start_with(async { Ok(()) }).await
    }

    async fn stop(&self) -> Result<(), LookupError> {
        self.core.stop_with(async { Ok(()) }).await
    }
}

#[async_trait]
impl LookupDataAdapter for StaticMapAdapter {
    async fn get(&self, key: &LookupKey) -> Result<LookupResult, LookupError> {
        self.core.ensure_running()?;
        self.core.track(Ok(self.resolve(key.value())))
    }
}

pub struct StaticMapAdapterFactory;

impl PluginFactory for StaticMapAdapterFactory {
    type Instance = dyn LookupDataAdapter;

    fn descriptor(&self) -> Descriptor {
        Descriptor::for_settings::<StaticMapSettings>(
            StaticMapAdapter::TYPE_NAME,
            "staticmap_adapter",
        )
    }

    fn validate(&self, config: &PluginConfig) -> FieldErrors {
        validate_settings::<StaticMapSettings>(config)
    }

    fn create(
        &self,
        id: i64,
        name: &str,
        config: PluginConfig,
    ) -> Result<Arc<dyn LookupDataAdapter>, LookupError> {
        let settings: StaticMapSettings = config.parse()?;
        Ok(Arc::new(StaticMapAdapter::new(id, name, config, settings)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn adapter(entries: Value, case_insensitive: bool) -> Arc<dyn LookupDataAdapter> {
        let config = PluginConfig::new("staticmap")
            .with_field("entries", entries)
            .with_field("case_insensitive", case_insensitive);
        let adapter = StaticMapAdapterFactory.create(1, "static", config).unwrap();
        adapter.start().await.unwrap();
        adapter
    }

    #[tokio::test]
    async fn test_scalar_and_missing() {
        let adapter = adapter(json!({"k1": "v1", "port": 443}), false).await;

        let hit = adapter.get(&"k1".into()).await.unwrap();
        assert_eq!(hit, LookupResult::single("v1"));

        let number = adapter.get(&"port".into()).await.unwrap();
        assert_eq!(number.single_value(), Some(&json!(443)));

        let miss = adapter.get(&"K1".into()).await.unwrap();
        assert!(!miss.has_result());
    }

    #[tokio::test]
    async fn test_object_values() {
        let adapter = adapter(
            json!({
                "10.0.0.1": {"value": "office", "city": "Berlin"},
                "10.0.0.2": {"city": "Hamburg"}
            }),
            false,
        )
        .await;

        let promoted = adapter.get(&"10.0.0.1".into()).await.unwrap();
        assert_eq!(promoted.single_value(), Some(&json!("office")));
        assert_eq!(promoted.multi_value().unwrap()["city"], json!("Berlin"));

        let multi_only = adapter.get(&"10.0.0.2".into()).await.unwrap();
        assert!(multi_only.has_result());
        assert!(multi_only.single_value().is_none());
    }

    #[tokio::test]
    async fn test_case_insensitive() {
        let adapter = adapter(json!({"Admin": "yes"}), true).await;
        assert_eq!(
            adapter.get(&"ADMIN".into()).await.unwrap(),
            LookupResult::single("yes")
        );
    }

    #[test]
    fn test_validation() {
        let factory = StaticMapAdapterFactory;
        let ok = PluginConfig::new("staticmap").with_field("entries", json!({"a": 1}));
        assert!(factory.validate(&ok).is_empty());

        let list = PluginConfig::new("staticmap").with_field("entries", json!({"a": [1, 2]}));
        assert_eq!(
            factory.validate(&list)["entries"],
            vec!["value of 'a' must be a scalar or an object".to_string()]
        );
    }
}
