//! Configuration records for caches, data adapters and lookup tables.
//!
//! Records are plain data; the live instances built from them are owned by
//! [`crate::lookup::LookupService`].
//!
//! - [`Component`] - A cache or data adapter configuration
//! - [`TableDefinition`] - A lookup table binding a cache and an adapter by name
//!
//! `NewComponent` / `NewTable` carry the fields of create and update requests.

pub mod component;
pub mod table;

pub use component::{Component, ComponentKind, NewComponent};
pub use table::{NewTable, TableDefinition};
