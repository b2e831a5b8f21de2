//! In-process loading cache bounded by size and expiry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use super::{optional_millis, optional_secs};
use crate::lookup::{
    CachePolicy, ComponentCore, Descriptor, FieldErrors, Lifecycle, Loader, LoadingCache,
    LookupCache, LookupError, LookupKey, LookupResult, PluginConfig, PluginFactory,
    validate_settings,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct MemoryCacheSettings {
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub max_size: u64,
    /// Entries unread for this long expire, `0` for never.
    pub expire_after_access_secs: u64,
    /// Entries older than this expire, `0` for never.
    pub expire_after_write_secs: u64,
    pub load_timeout_ms: u64,
}

impl Default for MemoryCacheSettings {
    fn default() -> Self {
        Self {
            max_size: 1000,
            expire_after_access_secs: 60,
            expire_after_write_secs: 0,
            load_timeout_ms: 0,
        }
    }
}

impl MemoryCacheSettings {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            retain: true,
            max_entries: Some(usize::try_from(self.max_size).unwrap_or(usize::MAX)),
            expire_after_write: optional_secs(self.expire_after_write_secs),
            expire_after_access: optional_secs(self.expire_after_access_secs),
            load_timeout: optional_millis(self.load_timeout_ms),
        }
    }
}

/// Results kept in process memory.
///
/// Entries expire by age or idleness and the least recently read entry is
/// evicted once `max_size` is exceeded. A result's own cache TTL shortens
/// its lifetime further.
pub struct MemoryCache {
    core: ComponentCore,
    engine: LoadingCache,
}

impl MemoryCache {
    pub const TYPE_NAME: &'static str = "memory";

    pub fn new(id: i64, name: &str, config: PluginConfig, settings: &MemoryCacheSettings) -> Self {
        Self {
            core: ComponentCore::new(id, name, config),
            engine: LoadingCache::new(name, settings.policy()),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.engine.entry_count()
    }
}

#[async_trait]
impl Lifecycle for MemoryCache {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    async fn start(&self) -> Result<(), LookupError> {
        self.core.start_with(async { Ok(()) }).await
    }

    async fn stop(&self) -> Result<(), LookupError> {
        self.core
            .stop_with(async {
                self.engine.purge();
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl LookupCache for MemoryCache {
    async fn get(&self, key: &LookupKey, loader: Loader) -> Result<LookupResult, LookupError> {
        self.core.ensure_running()?;
        self.core.track(self.engine.get(key, loader).await)
    }

    async fn get_if_present(&self, key: &LookupKey) -> Result<Option<LookupResult>, LookupError> {
        self.core.ensure_running()?;
        Ok(self.engine.get_if_present(key))
    }

    async fn purge(&self) -> Result<(), LookupError> {
        self.core.ensure_running()?;
        self.engine.purge();
        Ok(())
    }

    async fn purge_key(&self, key: &LookupKey) -> Result<(), LookupError> {
        self.core.ensure_running()?;
        self.engine.purge_key(key);
        Ok(())
    }
}

pub struct MemoryCacheFactory;

impl PluginFactory for MemoryCacheFactory {
    type Instance = dyn LookupCache;

    fn descriptor(&self) -> Descriptor {
        Descriptor::for_settings::<MemoryCacheSettings>(MemoryCache::TYPE_NAME, "memory_cache")
    }

    fn validate(&self, config: &PluginConfig) -> FieldErrors {
        validate_settings::<MemoryCacheSettings>(config)
    }

    fn create(
        &self,
        id: i64,
        name: &str,
        config: PluginConfig,
    ) -> Result<Arc<dyn LookupCache>, LookupError> {
        let settings: MemoryCacheSettings = config.parse()?;
        Ok(Arc::new(MemoryCache::new(id, name, config, &settings)))
    }
}
