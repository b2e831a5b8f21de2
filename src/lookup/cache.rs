//! Lookup cache contract.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

use crate::lookup::error::LookupError;
use crate::lookup::key::LookupKey;
use crate::lookup::lifecycle::Lifecycle;
use crate::lookup::result::LookupResult;

/// Deferred fetch handed to [`LookupCache::get`] and run only on a miss.
///
/// `'static` because the load may outlive the caller that started it: other
/// callers coalesced on the same key still wait for its outcome.
pub type Loader = Pin<Box<dyn Future<Output = Result<LookupResult, LookupError>> + Send>>;

/// Wraps a future into a [`Loader`].
pub fn loader<F>(fetch: F) -> Loader
where
    F: Future<Output = Result<LookupResult, LookupError>> + Send + 'static,
{
    Box::pin(fetch)
}

/// Pluggable, lifecycle-managed load-through cache.
///
/// # Guarantees
///
/// - **Single flight**: while no valid entry exists for a key, concurrent
///   `get` calls for that key run at most one loader and all observe its
///   outcome. Different keys load independently.
/// - **Error state**: a failed load is recorded as the cache's error state and
///   returned to every coalesced caller; the next successful `get` clears it.
/// - **Purge**: `purge`/`purge_key` are immediately visible to
///   `get_if_present`. Loads already in flight may still store their result
///   afterwards.
///
/// All operations fail with [`LookupError::NotRunning`] unless the cache has
/// been started and not yet stopped.
#[async_trait]
pub trait LookupCache: Lifecycle {
    /// Returns the cached result for `key`, loading it with `loader` on a miss.
    async fn get(&self, key: &LookupKey, loader: Loader) -> Result<LookupResult, LookupError>;

    /// Returns the cached result for `key` without ever loading.
    async fn get_if_present(&self, key: &LookupKey) -> Result<Option<LookupResult>, LookupError>;

    /// Invalidates every entry.
    async fn purge(&self) -> Result<(), LookupError>;

    /// Invalidates a single entry.
    async fn purge_key(&self, key: &LookupKey) -> Result<(), LookupError>;
}
