//! Runtime errors raised by caches, data adapters and lookup tables.

use std::time::Duration;

use crate::lookup::lifecycle::ServiceState;

/// Errors produced while resolving lookups or managing live instances.
///
/// `Clone` so that the outcome of one coalesced load can be handed to every
/// waiting caller and stored as the instance's error state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    /// The external source failed to answer.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A load exceeded the cache's load timeout.
    #[error("load timed out after {0:?}")]
    Timeout(Duration),

    /// Backing store (e.g. Redis) failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// An operation was invoked on an instance that is not running.
    #[error("'{name}' is not running (state: {state})")]
    NotRunning { name: String, state: ServiceState },

    /// A table, or the cache or adapter it references, cannot be resolved.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// `start()` failed; the instance is in the failed state.
    #[error("failed to start: {0}")]
    Startup(String),

    /// Configuration could not be parsed into the type's settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No factory is registered under the requested type name.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// The load task ended without publishing an outcome (panic or runtime shutdown).
    #[error("load aborted: {0}")]
    Aborted(String),
}

impl LookupError {
    /// Builds a fetch error from any displayable source error.
    pub fn fetch(err: impl std::fmt::Display) -> Self {
        Self::Fetch(err.to_string())
    }

    /// Whether this error means the lookup could not be routed at all,
    /// as opposed to a runtime failure of a resolved instance.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}
