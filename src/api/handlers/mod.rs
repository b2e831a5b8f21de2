//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod components;
pub mod health;
pub mod system;
pub mod tables;

pub use components::{
    create_adapter_handler, create_cache_handler, delete_adapter_handler, delete_cache_handler,
    get_adapter_handler, get_cache_handler, list_adapters_handler, list_caches_handler,
    purge_cache_handler, query_adapter_handler, update_adapter_handler, update_cache_handler,
    validate_adapter_handler, validate_cache_handler,
};
pub use health::health_handler;
pub use system::{adapter_types_handler, cache_types_handler, error_states_handler};
pub use tables::{
    create_table_handler, delete_table_handler, get_table_handler, list_tables_handler,
    query_table_handler, update_table_handler, validate_table_handler,
};
