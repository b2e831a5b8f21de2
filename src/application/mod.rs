//! Application layer services implementing the management operations.
//!
//! Services validate input, enforce referential rules between tables and
//! their caches and adapters, call the repositories and announce every
//! successful mutation as a change event. HTTP handlers only translate
//! between DTOs and these services.
//!
//! # Available Services
//!
//! - [`services::component_service::ComponentService`] - Caches and data adapters
//! - [`services::table_service::TableService`] - Lookup tables
//! - [`services::auth_service::AuthService`] - API token authentication

pub mod services;
