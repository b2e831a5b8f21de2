//! Built-in lookup data adapter types.
//!
//! - [`StaticMapAdapter`] (`staticmap`) - Fixed key → value map held in its configuration

mod static_map;

pub use static_map::{StaticMapAdapter, StaticMapAdapterFactory, StaticMapSettings};
