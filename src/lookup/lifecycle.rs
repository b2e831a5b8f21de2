//! Lifecycle state machine and shared bookkeeping for live caches and adapters.
//!
//! Every cache and data adapter embeds a [`ComponentCore`] holding its identity,
//! configuration snapshot, lifecycle state and error state. Implementations
//! drive their own startup/shutdown work through [`ComponentCore::start_with`]
//! and [`ComponentCore::stop_with`], which own the state transitions:
//!
//! ```text
//! idle ──start──▶ starting ──ok──▶ running ──stop──▶ stopping ──▶ terminated
//!                    │                                               ▲
//!                    └──err──▶ failed ──────────stop─────────────────┘
//! ```

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use tracing::{error, info, warn};

use crate::lookup::error::LookupError;
use crate::lookup::registry::PluginConfig;

/// Lifecycle state of a live cache or data adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Idle,
    Starting,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Terminated => "terminated",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Single-slot holder for the last failure of an instance.
///
/// Overwritten on every transition; absence is the default and recovered state.
#[derive(Debug, Default)]
pub struct ErrorState {
    slot: RwLock<Option<LookupError>>,
}

impl ErrorState {
    pub fn get(&self) -> Option<LookupError> {
        self.slot.read().clone()
    }

    pub fn set(&self, error: LookupError) {
        *self.slot.write() = Some(error);
    }

    pub fn clear(&self) {
        // Skip the write lock on the hot path when there is nothing to clear.
        if self.slot.read().is_some() {
            *self.slot.write() = None;
        }
    }
}

/// Identity, configuration and runtime bookkeeping shared by all instances.
#[derive(Debug)]
pub struct ComponentCore {
    id: i64,
    name: String,
    config: PluginConfig,
    state: Mutex<ServiceState>,
    error: ErrorState,
}

impl ComponentCore {
    pub fn new(id: i64, name: impl Into<String>, config: PluginConfig) -> Self {
        Self {
            id,
            name: name.into(),
            config,
            state: Mutex::new(ServiceState::Idle),
            error: ErrorState::default(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    pub fn error(&self) -> Option<LookupError> {
        self.error.get()
    }

    pub fn set_error(&self, error: LookupError) {
        self.error.set(error);
    }

    pub fn clear_error(&self) {
        self.error.clear();
    }

    /// Records the outcome of an operation in the error state and passes it through.
    pub fn track<T>(&self, result: Result<T, LookupError>) -> Result<T, LookupError> {
        match &result {
            Ok(_) => self.clear_error(),
            Err(e) => self.set_error(e.clone()),
        }
        result
    }

    /// Fails with [`LookupError::NotRunning`] unless the instance is running.
    pub fn ensure_running(&self) -> Result<(), LookupError> {
        match self.state() {
            ServiceState::Running => Ok(()),
            state => Err(LookupError::NotRunning {
                name: self.name.clone(),
                state,
            }),
        }
    }

    /// Runs `startup` as the idle → starting → running transition.
    ///
    /// On failure the instance enters [`ServiceState::Failed`] and the error
    /// is recorded as its error state.
    ///
    /// # Errors
    ///
    /// Returns the startup error, or [`LookupError::Startup`] if the instance
    /// was not idle.
    pub async fn start_with<F>(&self, startup: F) -> Result<(), LookupError>
    where
        F: Future<Output = Result<(), LookupError>>,
    {
        {
            let mut state = self.state.lock();
            if *state != ServiceState::Idle {
                return Err(LookupError::Startup(format!(
                    "'{}' cannot be started from state {}",
                    self.name, *state
                )));
            }
            *state = ServiceState::Starting;
        }

        match startup.await {
            Ok(()) => {
                *self.state.lock() = ServiceState::Running;
                self.clear_error();
                info!(id = self.id, name = %self.name, "Started {}", self.config.type_name());
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = ServiceState::Failed;
                self.set_error(e.clone());
                error!(id = self.id, name = %self.name, error = %e, "Failed to start");
                Err(e)
            }
        }
    }

    /// Runs `shutdown` as the running/failed → stopping → terminated transition.
    ///
    /// Only the first call performs the shutdown work; later calls return `Ok`.
    /// The instance ends up terminated even when `shutdown` fails.
    ///
    /// # Errors
    ///
    /// Returns the shutdown error, or [`LookupError::Startup`] if a start is
    /// still in progress.
    pub async fn stop_with<F>(&self, shutdown: F) -> Result<(), LookupError>
    where
        F: Future<Output = Result<(), LookupError>>,
    {
        {
            let mut state = self.state.lock();
            match *state {
                ServiceState::Running | ServiceState::Failed => *state = ServiceState::Stopping,
                ServiceState::Idle => {
                    *state = ServiceState::Terminated;
                    return Ok(());
                }
                ServiceState::Stopping | ServiceState::Terminated => return Ok(()),
                ServiceState::Starting => {
                    return Err(LookupError::Startup(format!(
                        "'{}' cannot be stopped while starting",
                        self.name
                    )));
                }
            }
        }

        let result = shutdown.await;
        *self.state.lock() = ServiceState::Terminated;

        match &result {
            Ok(()) => info!(id = self.id, name = %self.name, "Stopped"),
            Err(e) => warn!(id = self.id, name = %self.name, error = %e, "Unclean shutdown"),
        }
        result
    }
}

/// Start/stop contract shared by caches and data adapters.
///
/// `start` and `stop` are never called concurrently for one instance; the
/// [`crate::lookup::LookupService`] serializes them.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    fn core(&self) -> &ComponentCore;

    async fn start(&self) -> Result<(), LookupError>;

    async fn stop(&self) -> Result<(), LookupError>;

    fn id(&self) -> i64 {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn state(&self) -> ServiceState {
        self.core().state()
    }

    fn error(&self) -> Option<LookupError> {
        self.core().error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn core() -> ComponentCore {
        ComponentCore::new(7, "geo", PluginConfig::new("none"))
    }

    #[tokio::test]
    async fn test_start_then_stop() {
        let core = core();
        assert_eq!(core.state(), ServiceState::Idle);

        core.start_with(async { Ok(()) }).await.unwrap();
        assert_eq!(core.state(), ServiceState::Running);
        assert!(core.ensure_running().is_ok());

        core.stop_with(async { Ok(()) }).await.unwrap();
        assert_eq!(core.state(), ServiceState::Terminated);
        assert!(core.ensure_running().is_err());
    }

    #[tokio::test]
    async fn test_failed_start_records_error() {
        let core = core();

        let result = core
            .start_with(async { Err(LookupError::Startup("no route to host".into())) })
            .await;

        assert!(result.is_err());
        assert_eq!(core.state(), ServiceState::Failed);
        assert_eq!(
            core.error(),
            Some(LookupError::Startup("no route to host".into()))
        );
        assert!(matches!(
            core.ensure_running(),
            Err(LookupError::NotRunning {
                state: ServiceState::Failed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let core = core();
        core.start_with(async { Ok(()) }).await.unwrap();

        assert!(core.start_with(async { Ok(()) }).await.is_err());
        assert_eq!(core.state(), ServiceState::Running);
    }

    #[tokio::test]
    async fn test_shutdown_work_runs_once() {
        let core = core();
        let calls = AtomicUsize::new(0);
        core.start_with(async { Ok(()) }).await.unwrap();

        for _ in 0..3 {
            core.stop_with(async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_shutdown_still_terminates() {
        let core = core();
        core.start_with(async { Ok(()) }).await.unwrap();

        let result = core
            .stop_with(async { Err(LookupError::Backend("connection reset".into())) })
            .await;

        assert!(result.is_err());
        assert_eq!(core.state(), ServiceState::Terminated);
    }

    #[test]
    fn test_track_sets_and_clears_error() {
        let core = core();
        assert!(core.error().is_none());

        let _ = core.track::<()>(Err(LookupError::Fetch("boom".into())));
        assert_eq!(core.error(), Some(LookupError::Fetch("boom".into())));

        let _ = core.track(Ok(()));
        assert!(core.error().is_none());
    }
}
