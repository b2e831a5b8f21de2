//! Redis-backed cache shared by every node using the same Redis.

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::{Validate, ValidationError};

use super::optional_millis;
use crate::lookup::{
    CachePolicy, ComponentCore, Descriptor, FieldErrors, Lifecycle, Loader, LoadingCache,
    LookupCache, LookupError, LookupKey, LookupResult, PluginConfig, PluginFactory, loader,
    validate_settings,
};

const SCAN_BATCH: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct RedisCacheSettings {
    #[validate(custom(function = "validate_redis_url"))]
    pub url: String,
    #[validate(length(max = 128, message = "must be at most 128 characters"))]
    pub key_prefix: String,
    /// Upper bound on the lifetime of a stored result.
    #[validate(range(min = 1, message = "must be at least 1 second"))]
    pub ttl_secs: u64,
    pub load_timeout_ms: u64,
}

impl Default for RedisCacheSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "lookup:".to_string(),
            ttl_secs: 3600,
            load_timeout_ms: 0,
        }
    }
}

fn validate_redis_url(url: &str) -> Result<(), ValidationError> {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "redis" | "rediss") => Ok(()),
        _ => {
            let mut error = ValidationError::new("redis_url");
            error.message = Some("must be a redis:// or rediss:// URL".into());
            Err(error)
        }
    }
}

/// Results stored in Redis with a TTL.
///
/// Backend failures are fail-open: they are logged and treated as a miss, so
/// an unavailable Redis degrades to loading from the adapter. Loads of one key
/// are coalesced within this process only.
pub struct RedisCache {
    core: ComponentCore,
    settings: RedisCacheSettings,
    connection: RwLock<Option<ConnectionManager>>,
    engine: LoadingCache,
}

impl RedisCache {
    pub const TYPE_NAME: &'static str = "redis";

    pub fn new(id: i64, name: &str, config: PluginConfig, settings: RedisCacheSettings) -> Self {
        let policy = CachePolicy {
            load_timeout: optional_millis(settings.load_timeout_ms),
            ..CachePolicy::pass_through()
        };
        Self {
            core: ComponentCore::new(id, name, config),
            settings,
            connection: RwLock::new(None),
            engine: LoadingCache::new(name, policy),
        }
    }

    /// Namespace of this instance: `{key_prefix}{name}:`.
    fn namespace(&self) -> String {
        format!("{}{}:", self.settings.key_prefix, self.core.name())
    }

    /// Full Redis key for a lookup key.
    fn build_key(&self, key: &LookupKey) -> String {
        let encoded = serde_json::to_string(key).unwrap_or_else(|_| key.value().to_string());
        format!("{}{}", self.namespace(), encoded)
    }

    fn connection(&self) -> Result<ConnectionManager, LookupError> {
        self.connection
            .read()
            .clone()
            .ok_or_else(|| LookupError::Backend("not connected".into()))
    }

    async fn connect(&self) -> Result<(), LookupError> {
        info!(name = %self.core.name(), "Connecting to Redis at {}", self.settings.url);

        let client = Client::open(self.settings.url.as_str()).map_err(|e| {
            LookupError::Startup(format!("Failed to create Redis client: {e}"))
        })?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| LookupError::Startup(format!("Failed to connect to Redis: {e}")))?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| LookupError::Startup(format!("Redis PING failed: {e}")))?;

        *self.connection.write() = Some(manager);
        Ok(())
    }

    async fn scan_namespace(&self, conn: &mut ConnectionManager) -> Result<Vec<String>, LookupError> {
        let pattern = format!("{}*", escape_glob(&self.namespace()));
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(conn)
                .await
                .map_err(|e| LookupError::Backend(format!("Redis SCAN failed: {e}")))?;
            keys.extend(batch);
            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }
}

/// Escapes Redis glob metacharacters so the namespace matches literally.
fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl Lifecycle for RedisCache {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    async fn start(&self) -> Result<(), LookupError> {
        self.core.start_with(self.connect()).await
    }

    async fn stop(&self) -> Result<(), LookupError> {
        self.core
            .stop_with(async {
                self.connection.write().take();
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl LookupCache for RedisCache {
    async fn get(&self, key: &LookupKey, fetch: Loader) -> Result<LookupResult, LookupError> {
        self.core.ensure_running()?;
        let mut conn = self.connection()?;
        let redis_key = self.build_key(key);
        let max_ttl = self.settings.ttl_secs.max(1);

        // Runs once per key across coalesced callers: check Redis, else load and store.
        let through_redis = loader(async move {
            match conn.get::<_, Option<String>>(&redis_key).await {
                Ok(Some(raw)) => match serde_json::from_str::<LookupResult>(&raw) {
                    Ok(result) => {
                        debug!("Cache HIT: {}", redis_key);
                        return Ok(result);
                    }
                    Err(e) => warn!("Discarding undecodable entry {}: {}", redis_key, e),
                },
                Ok(None) => debug!("Cache MISS: {}", redis_key),
                Err(e) => warn!("Redis GET error for {}: {}", redis_key, e),
            }

            let result = fetch.await?;

            let ttl = result
                .cache_ttl()
                .map_or(max_ttl, |ttl| ttl.as_secs().clamp(1, max_ttl));
            match serde_json::to_string(&result) {
                Ok(raw) => {
                    if let Err(e) = conn.set_ex::<_, _, ()>(&redis_key, raw, ttl).await {
                        warn!("Redis SET error for {}: {}", redis_key, e);
                    }
                }
                Err(e) => warn!("Cannot encode result for {}: {}", redis_key, e),
            }
            Ok(result)
        });

        self.core.track(self.engine.get(key, through_redis).await)
    }

    async fn get_if_present(&self, key: &LookupKey) -> Result<Option<LookupResult>, LookupError> {
        self.core.ensure_running()?;
        let mut conn = self.connection()?;
        let redis_key = self.build_key(key);

        match conn.get::<_, Option<String>>(&redis_key).await {
            Ok(Some(raw)) => Ok(serde_json::from_str(&raw).ok()),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!("Redis GET error for {}: {}", redis_key, e);
                Ok(None)
            }
        }
    }

    async fn purge(&self) -> Result<(), LookupError> {
        self.core.ensure_running()?;
        let mut conn = self.connection()?;

        let keys = self.scan_namespace(&mut conn).await?;
        for chunk in keys.chunks(SCAN_BATCH) {
            conn.del::<_, i64>(chunk.to_vec())
                .await
                .map_err(|e| LookupError::Backend(format!("Redis DEL failed: {e}")))?;
        }
        info!(name = %self.core.name(), purged = keys.len(), "Cache purged");
        Ok(())
    }

    async fn purge_key(&self, key: &LookupKey) -> Result<(), LookupError> {
        self.core.ensure_running()?;
        let mut conn = self.connection()?;
        let redis_key = self.build_key(key);

        conn.del::<_, i64>(&redis_key)
            .await
            .map_err(|e| LookupError::Backend(format!("Redis DEL failed: {e}")))?;
        Ok(())
    }
}

pub struct RedisCacheFactory;

impl PluginFactory for RedisCacheFactory {
    type Instance = dyn LookupCache;

    fn descriptor(&self) -> Descriptor {
        Descriptor::for_settings::<RedisCacheSettings>(RedisCache::TYPE_NAME, "redis_cache")
    }

    fn validate(&self, config: &PluginConfig) -> FieldErrors {
        validate_settings::<RedisCacheSettings>(config)
    }

    fn create(
        &self,
        id: i64,
        name: &str,
        config: PluginConfig,
    ) -> Result<Arc<dyn LookupCache>, LookupError> {
        let settings: RedisCacheSettings = config.parse()?;
        Ok(Arc::new(RedisCache::new(id, name, config, settings)))
    }
}
