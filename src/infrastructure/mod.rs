//! Infrastructure layer for external integrations.
//!
//! Implements the interfaces defined by the domain and lookup layers.
//!
//! # Modules
//!
//! - [`adapters`] - Built-in lookup data adapter types
//! - [`caches`] - Built-in lookup cache types (none, memory, Redis)
//! - [`bus`] - Change notification transports
//! - [`persistence`] - PostgreSQL and in-memory configuration repositories

pub mod adapters;
pub mod bus;
pub mod caches;
pub mod persistence;
