//! Built-in lookup cache types.
//!
//! - [`NoneCache`] (`none`) - Pass-through; coalesces concurrent loads, keeps nothing
//! - [`MemoryCache`] (`memory`) - In-process cache with size and expiry bounds
//! - [`RedisCache`] (`redis`) - Shared Redis-backed cache, fail-open on backend errors
//!
//! All three run loads through [`crate::lookup::LoadingCache`], so the
//! single-flight guarantee holds per process for every type.

mod memory_cache;
mod none_cache;
mod redis_cache;

pub use memory_cache::{MemoryCache, MemoryCacheFactory, MemoryCacheSettings};
pub use none_cache::{NoneCache, NoneCacheFactory, NoneCacheSettings};
pub use redis_cache::{RedisCache, RedisCacheFactory, RedisCacheSettings};

use std::time::Duration;

/// Seconds setting where `0` disables the bound.
pub(crate) fn optional_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Milliseconds setting where `0` disables the bound.
pub(crate) fn optional_millis(millis: u64) -> Option<Duration> {
    (millis > 0).then(|| Duration::from_millis(millis))
}
