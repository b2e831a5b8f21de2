//! HTTP middleware for request processing and protection.
//!
//! Provides authentication, rate limiting, and request tracing.

pub mod auth;
pub mod rate_limit;
pub mod tracing;
