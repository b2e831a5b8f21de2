//! Domain layer: configuration records, repository contracts and change
//! notifications.
//!
//! # Architecture
//!
//! - [`entities`] - Table, cache and data adapter configuration records
//! - [`repositories`] - Data access trait definitions
//! - [`change_event`] - Change notification model and publisher contract
//! - [`change_listener`] - Worker applying notifications to live instances
//!
//! # Change Flow
//!
//! 1. A management service persists a mutation via a repository
//! 2. It publishes a [`change_event::ChangeEvent`] through a [`change_event::ChangePublisher`]
//! 3. Every node's [`change_listener::run_change_listener`] receives it
//! 4. [`crate::lookup::LookupService`] replaces the affected live instances

pub mod change_event;
pub mod change_listener;
pub mod entities;
pub mod repositories;
