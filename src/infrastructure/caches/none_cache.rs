//! Pass-through cache: every `get` loads, concurrent ones share the load.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::optional_millis;
use crate::lookup::{
    CachePolicy, ComponentCore, Descriptor, FieldErrors, Lifecycle, Loader, LoadingCache,
    LookupCache, LookupError, LookupKey, LookupResult, PluginConfig, PluginFactory,
    validate_settings,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct NoneCacheSettings {
    /// Bound on a single load, `0` for none.
    pub load_timeout_ms: u64,
}

/// A cache that stores nothing.
///
/// Used for tables whose adapter is cheap or must always be asked. Concurrent
/// lookups of one key still share a single adapter fetch.
pub struct NoneCache {
    core: ComponentCore,
    engine: LoadingCache,
}

impl NoneCache {
    pub const TYPE_NAME: &'static str = "none";

    pub fn new(id: i64, name: &str, config: PluginConfig, settings: &NoneCacheSettings) -> Self {
        let policy = CachePolicy {
            load_timeout: optional_millis(settings.load_timeout_ms),
            ..CachePolicy::pass_through()
        };
        Self {
            core: ComponentCore::new(id, name, config),
            engine: LoadingCache::new(name, policy),
        }
    }
}

#[async_trait]
impl Lifecycle for NoneCache {
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
impl LookupCache for NoneCache {
    async fn get(&self, key: &LookupKey, loader: Loader) -> Result<LookupResult, LookupError> {
        self.core.ensure_running()?;
        self.core.track(self.engine.get(key, loader).await)
    }

    async fn get_if_present(&self, _key: &LookupKey) -> Result<Option<LookupResult>, LookupError> {
        self.core.ensure_running()?;
        Ok(None)
    }

    async fn purge(&self) -> Result<(), LookupError> {
        self.core.ensure_running()
    }

    async fn purge_key(&self, _key: &LookupKey) -> Result<(), LookupError> {
        self.core.ensure_running()
    }
}

pub struct NoneCacheFactory;

impl PluginFactory for NoneCacheFactory {
    type Instance = dyn LookupCache;

    fn descriptor(&self) -> Descriptor {
        Descriptor::for_settings::<NoneCacheSettings>(NoneCache::TYPE_NAME, "none_cache")
    }

    fn validate(&self, config: &PluginConfig) -> FieldErrors {
        validate_settings::<NoneCacheSettings>(config)
    }

    fn create(
        &self,
        id: i64,
        name: &str,
        config: PluginConfig,
    ) -> Result<Arc<dyn LookupCache>, LookupError> {
        let settings: NoneCacheSettings = config.parse()?;
        Ok(Arc::new(NoneCache::new(id, name, config, &settings)))
    }
}
