//! Configuration storage.
//!
//! Concrete implementations of the domain repository traits.
//!
//! # Repositories
//!
//! - [`PgComponentRepository`] - Cache and data adapter records in PostgreSQL
//! - [`PgTableRepository`] - Lookup table records in PostgreSQL
//! - [`InMemoryRepository`] - Both record kinds in process memory, used when no
//!   database is configured and in tests

pub mod memory_repository;
pub mod pg_component_repository;
pub mod pg_table_repository;

pub use memory_repository::InMemoryRepository;
pub use pg_component_repository::PgComponentRepository;
pub use pg_table_repository::PgTableRepository;
