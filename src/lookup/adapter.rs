//! Lookup data adapter contract.

use async_trait::async_trait;

use crate::lookup::error::LookupError;
use crate::lookup::key::LookupKey;
use crate::lookup::lifecycle::Lifecycle;
use crate::lookup::result::LookupResult;

/// Pluggable, lifecycle-managed fetcher of authoritative values.
///
/// Adapters keep no cache of their own. A failed fetch is recorded as the
/// adapter's error state (see [`crate::lookup::ComponentCore::track`]) and
/// returned to the caller; a successful one clears it.
#[async_trait]
pub trait LookupDataAdapter: Lifecycle {
    /// Fetches the result for `key` from the external source.
    ///
    /// Idempotent. Fails with [`LookupError::NotRunning`] unless started.
    async fn get(&self, key: &LookupKey) -> Result<LookupResult, LookupError>;
}
