//! Lookup runtime: live caches, data adapters and the tables that compose them.
//!
//! # Architecture
//!
//! - [`LookupDataAdapter`] fetches authoritative values from an external source
//! - [`LookupCache`] fronts an adapter with load-through, single-flight caching
//! - [`LookupTable`] resolves a key through one cache and one adapter, by name
//! - [`LookupService`] owns every live instance and rebuilds them on change
//! - [`Registries`] maps type names to the factories that build instances
//!
//! Caches and adapters share the [`Lifecycle`] contract and embed a
//! [`ComponentCore`] carrying identity, configuration, state and error state.
//!
//! # Resolution Flow
//!
//! 1. `LookupService::new_builder().lookup_table(name).build()`
//! 2. [`LookupTable::lookup`] resolves the table's cache and adapter by name
//! 3. The cache returns a stored result or runs one load through the adapter
//! 4. Table defaults are applied when the result is empty

pub mod adapter;
pub mod cache;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod loading;
pub mod registry;
pub mod result;
pub mod service;
pub mod table;

pub use adapter::LookupDataAdapter;
pub use cache::{Loader, LookupCache, loader};
pub use error::LookupError;
pub use key::LookupKey;
pub use lifecycle::{ComponentCore, ErrorState, Lifecycle, ServiceState};
pub use loading::{CachePolicy, LoadingCache};
pub use registry::{
    AdapterTypes, CacheTypes, Descriptor, FieldErrors, PluginConfig, PluginFactory, Registries,
    TypeRegistry, field_errors, validate_settings,
};
pub use result::LookupResult;
pub use service::{ErrorStates, LiveSummary, LookupService};
pub use table::{LookupTable, LookupTableBuilder, TableBinding};
