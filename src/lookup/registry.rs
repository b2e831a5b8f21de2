//! Type registry: maps a plugin type name to its factory and descriptor.
//!
//! There is one registry per pluggable kind ([`CacheTypes`], [`AdapterTypes`]),
//! bundled in [`Registries`]. Registries are assembled once at startup and
//! read-only afterwards; the [`crate::lookup::LookupService`] and the
//! management services share them through an `Arc`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::lookup::adapter::LookupDataAdapter;
use crate::lookup::cache::LookupCache;
use crate::lookup::error::LookupError;

/// Field name → validation messages. Empty means valid.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Type-tagged configuration of a cache or data adapter.
///
/// Serialized flat: `{"type": "memory", "max_size": 1000, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl PluginConfig {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Map::new(),
        }
    }

    /// Builds a config from a typed settings struct.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidConfig`] if `settings` does not serialize
    /// to a JSON object.
    pub fn from_settings<T: Serialize>(
        type_name: impl Into<String>,
        settings: &T,
    ) -> Result<Self, LookupError> {
        match serde_json::to_value(settings) {
            Ok(Value::Object(fields)) => Ok(Self {
                type_name: type_name.into(),
                fields,
            }),
            Ok(other) => Err(LookupError::InvalidConfig(format!(
                "settings must be an object, got {other}"
            ))),
            Err(e) => Err(LookupError::InvalidConfig(e.to_string())),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Parses the type-specific fields into the settings struct of the type.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidConfig`] on missing or mistyped fields.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, LookupError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| LookupError::InvalidConfig(e.to_string()))
    }
}

/// Converts `validator` errors into the flat field → messages map.
pub fn field_errors(errors: &validator::ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("invalid value ({})", e.code),
            })
            .collect();
        out.insert(field.to_string(), messages);
    }
    out
}

/// Parses and validates a typed settings struct, reporting problems per field.
pub fn validate_settings<T>(config: &PluginConfig) -> FieldErrors
where
    T: DeserializeOwned + validator::Validate,
{
    match config.parse::<T>() {
        Ok(settings) => match settings.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => field_errors(&errors),
        },
        Err(e) => FieldErrors::from([("config".to_string(), vec![e.to_string()])]),
    }
}

/// Metadata advertised for a plugin type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    #[serde(rename = "type")]
    pub type_name: String,
    /// Name of the settings schema accepted by the type.
    pub config_schema: String,
    pub default_config: PluginConfig,
}

impl Descriptor {
    /// Descriptor whose default configuration is the `Default` of the type's settings.
    pub fn for_settings<T: Serialize + Default>(
        type_name: &str,
        config_schema: &str,
    ) -> Self {
        Self {
            type_name: type_name.to_string(),
            config_schema: config_schema.to_string(),
            default_config: PluginConfig::from_settings(type_name, &T::default())
                .unwrap_or_else(|_| PluginConfig::new(type_name)),
        }
    }
}

/// Constructs live instances of one plugin type.
pub trait PluginFactory: Send + Sync {
    /// The live instance kind (`dyn LookupCache` or `dyn LookupDataAdapter`).
    type Instance: ?Sized;

    fn descriptor(&self) -> Descriptor;

    /// Type-specific validation of a submitted configuration.
    fn validate(&self, config: &PluginConfig) -> FieldErrors;

    /// Builds a new, idle instance. It must be started before use.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidConfig`] if the configuration cannot be parsed.
    fn create(
        &self,
        id: i64,
        name: &str,
        config: PluginConfig,
    ) -> Result<Arc<Self::Instance>, LookupError>;
}

/// Mapping from type name to factory for one pluggable kind.
pub struct TypeRegistry<I: ?Sized> {
    factories: BTreeMap<String, Arc<dyn PluginFactory<Instance = I>>>,
}

impl<I: ?Sized + 'static> TypeRegistry<I> {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registers a factory under the type name of its descriptor, replacing
    /// any previous registration of that name.
    pub fn register(mut self, factory: impl PluginFactory<Instance = I> + 'static) -> Self {
        let type_name = factory.descriptor().type_name;
        self.factories.insert(type_name, Arc::new(factory));
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&Arc<dyn PluginFactory<Instance = I>>> {
        self.factories.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Descriptors of all registered types, keyed by type name.
    pub fn descriptors(&self) -> BTreeMap<String, Descriptor> {
        self.factories
            .iter()
            .map(|(name, factory)| (name.clone(), factory.descriptor()))
            .collect()
    }

    /// Validates `config` with the factory of its type.
    pub fn validate(&self, config: &PluginConfig) -> FieldErrors {
        match self.get(config.type_name()) {
            Some(factory) => factory.validate(config),
            None => FieldErrors::from([(
                "config.type".to_string(),
                vec![format!("Unknown type '{}'", config.type_name())],
            )]),
        }
    }

    /// Builds an idle instance with the factory of the configuration's type.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownType`] if no factory is registered, or
    /// the factory's own error.
    pub fn create(
        &self,
        id: i64,
        name: &str,
        config: PluginConfig,
    ) -> Result<Arc<I>, LookupError> {
        let factory = self
            .get(config.type_name())
            .ok_or_else(|| LookupError::UnknownType(config.type_name().to_string()))?;
        factory.create(id, name, config)
    }
}

impl<I: ?Sized + 'static> Default for TypeRegistry<I> {
    fn default() -> Self {
        Self::new()
    }
}

pub type CacheTypes = TypeRegistry<dyn LookupCache>;
pub type AdapterTypes = TypeRegistry<dyn LookupDataAdapter>;

/// The cache and adapter registries of the process.
#[derive(Default)]
pub struct Registries {
    pub caches: CacheTypes,
    pub adapters: AdapterTypes,
}

impl Registries {
    pub fn new(caches: CacheTypes, adapters: AdapterTypes) -> Self {
        Self { caches, adapters }
    }

    /// Registries populated with every built-in cache and adapter type.
    pub fn builtin() -> Self {
        use crate::infrastructure::adapters::StaticMapAdapterFactory;
        use crate::infrastructure::caches::{
            MemoryCacheFactory, NoneCacheFactory, RedisCacheFactory,
        };

        Self {
            caches: CacheTypes::new()
                .register(NoneCacheFactory)
                .register(MemoryCacheFactory)
                .register(RedisCacheFactory),
            adapters: AdapterTypes::new().register(StaticMapAdapterFactory),
        }
    }
}
