//! Business logic services for the application layer.

pub mod auth_service;
pub mod component_service;
pub mod table_service;
mod validation;

pub use auth_service::AuthService;
pub use component_service::ComponentService;
pub use table_service::TableService;
