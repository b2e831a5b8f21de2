//! Repository trait definitions for the configuration records.
//!
//! Traits define the contract; implementations live in
//! `crate::infrastructure::persistence`. Mock implementations are generated
//! via `mockall` for service tests.
//!
//! - [`ComponentRepository`] - Cache and data adapter configurations
//! - [`TableRepository`] - Lookup table configurations

pub mod component_repository;
pub mod listing;
pub mod table_repository;

pub use component_repository::ComponentRepository;
pub use listing::{ListQuery, Page, SortField, SortKey, SortOrder};
pub use table_repository::TableRepository;

#[cfg(test)]
pub use component_repository::MockComponentRepository;
#[cfg(test)]
pub use table_repository::MockTableRepository;
