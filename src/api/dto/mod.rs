//! Data Transfer Objects for API requests and responses.
//!
//! All DTOs use Serde for JSON serialization/deserialization. Field
//! validation happens in the services so that the validate endpoints and
//! the mutating endpoints report the same field map.

pub mod component;
pub mod health;
pub mod lookup;
pub mod pagination;
pub mod table;
