//! Change notification transports.
//!
//! - [`LocalChangeBus`] - In-process broadcast, for single-node deployments
//! - [`PgChangeBus`] - PostgreSQL `LISTEN`/`NOTIFY`, reaching every node sharing the database
//!
//! Both implement [`crate::domain::change_event::ChangePublisher`] and hand out
//! broadcast receivers of [`crate::domain::change_event::ChangeNotice`]s for
//! [`crate::domain::change_listener::run_change_listener`].

mod local_bus;
mod pg_bus;

pub use local_bus::LocalChangeBus;
pub use pg_bus::PgChangeBus;

/// Notices buffered per subscriber before it counts as lagged.
pub const BUS_CAPACITY: usize = 256;
