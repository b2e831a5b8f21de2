//! HTTP server initialization and runtime setup.
//!
//! Handles storage selection, migrations, lookup materialization, the change
//! listener, and the Axum server lifecycle including graceful shutdown.

use crate::application::services::AuthService;
use crate::config::{ChangeBusKind, Config};
use crate::domain::change_event::{ChangeNotice, ChangePublisher};
use crate::domain::change_listener::run_change_listener;
use crate::domain::repositories::{ComponentRepository, TableRepository};
use crate::infrastructure::bus::{BUS_CAPACITY, LocalChangeBus, PgChangeBus};
use crate::infrastructure::persistence::{
    InMemoryRepository, PgComponentRepository, PgTableRepository,
};
use crate::lookup::{LookupService, Registries};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

/// Configuration storage selected at startup.
pub struct Storage {
    pub components: Arc<dyn ComponentRepository>,
    pub tables: Arc<dyn TableRepository>,
    /// Set when the records live in PostgreSQL.
    pub pool: Option<Arc<PgPool>>,
}

impl Storage {
    /// Opens PostgreSQL storage (applying migrations) or falls back to memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database stays unreachable after the
    /// configured retries or a migration fails.
    pub async fn open(config: &Config) -> Result<Self> {
        let Some(url) = config.database_url.as_deref() else {
            tracing::warn!("No database configured; lookup configuration is kept in memory");
            let repo = Arc::new(InMemoryRepository::new());
            return Ok(Self {
                components: repo.clone(),
                tables: repo,
                pool: None,
            });
        };

        let pool = Arc::new(connect_database(config, url).await?);
        tracing::info!("Connected to database");

        sqlx::migrate!("./migrations")
            .run(pool.as_ref())
            .await
            .context("Failed to apply migrations")?;

        Ok(Self {
            components: Arc::new(PgComponentRepository::new(pool.clone())),
            tables: Arc::new(PgTableRepository::new(pool.clone())),
            pool: Some(pool),
        })
    }
}

/// Connects the pool, retrying with exponential backoff.
///
/// # Errors
///
/// Returns the last connection error once `DB_CONNECT_RETRIES` is exhausted.
pub async fn connect_database(config: &Config, url: &str) -> Result<PgPool> {
    let strategy = ExponentialBackoff::from_millis(10)
        .factor(20)
        .max_delay(Duration::from_secs(10))
        .map(jitter)
        .take(config.db_connect_retries);

    let options = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime));

    Retry::spawn(strategy, || {
        let options = options.clone();
        async move {
            options.connect(url).await.inspect_err(|e| {
                tracing::warn!(error = %e, "Database not reachable, retrying");
            })
        }
    })
    .await
    .context("Failed to connect to database")
}

/// Builds the change bus and subscribes this node to it.
async fn open_change_bus(
    config: &Config,
    pool: Option<Arc<PgPool>>,
) -> Result<(Arc<dyn ChangePublisher>, broadcast::Receiver<ChangeNotice>)> {
    match (config.change_bus, pool) {
        (ChangeBusKind::Postgres, Some(pool)) => {
            let bus = PgChangeBus::new(pool, config.change_channel.clone());
            let rx = bus
                .subscribe()
                .await
                .context("Failed to listen for change notifications")?;
            Ok((Arc::new(bus), rx))
        }
        (ChangeBusKind::Postgres, None) => {
            anyhow::bail!("CHANGE_BUS=postgres requires a database")
        }
        (ChangeBusKind::Local, _) => {
            let bus = LocalChangeBus::new(BUS_CAPACITY);
            let rx = bus.subscribe();
            Ok((Arc::new(bus), rx))
        }
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Configuration storage (PostgreSQL with migrations, or in-memory)
/// - Change bus subscription
/// - Live lookup instances from the stored configuration
/// - Change listener worker
/// - Axum HTTP server
///
/// On SIGINT/SIGTERM the server drains in-flight requests, then every live
/// cache and adapter is stopped.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The initial configuration cannot be read
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let storage = Storage::open(&config).await?;
    let registries = Arc::new(Registries::builtin());

    let lookup = Arc::new(LookupService::new(
        registries.clone(),
        storage.components.clone(),
        storage.tables.clone(),
    ));

    // Subscribe before the initial refresh so no change slips in between.
    let (publisher, notices) = open_change_bus(&config, storage.pool.clone()).await?;

    lookup
        .refresh_all()
        .await
        .context("Failed to materialize lookup tables")?;

    tokio::spawn(run_change_listener(notices, lookup.clone()));
    tracing::info!("Change listener started");

    let auth_service = AuthService::new(
        config.token_signing_secret.clone(),
        &config.api_token_hashes,
    );
    if auth_service.accepted_count() == 0 {
        tracing::warn!("API_TOKEN_HASHES is empty; every management request will be rejected");
    }

    let state = AppState::new(
        storage.components,
        storage.tables,
        registries,
        publisher,
        lookup.clone(),
        auth_service,
    );

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    lookup.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
