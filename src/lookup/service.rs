//! Process-wide registry of live tables, caches and data adapters.
//!
//! [`LookupService`] owns every live instance for the lifetime of the process,
//! keyed by name. Lookups read the name maps directly; materialization (driven
//! by [`ChangeEvent`]s or [`LookupService::refresh_all`]) is serialized by an
//! async mutex that lookups never take.
//!
//! Replacing an instance always follows the same order: build and start the
//! new one, swap it in under its name, then stop whatever it replaced. The
//! old instance is stopped exactly once because only the caller that removed
//! it from the map holds it afterwards.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::change_event::{ChangeAction, ChangeEvent, ChangeKind, ChangePublisher};
use crate::domain::entities::{Component, ComponentKind};
use crate::domain::repositories::{ComponentRepository, TableRepository};
use crate::error::AppError;
use crate::lookup::adapter::LookupDataAdapter;
use crate::lookup::cache::LookupCache;
use crate::lookup::error::LookupError;
use crate::lookup::key::LookupKey;
use crate::lookup::lifecycle::{Lifecycle, ServiceState};
use crate::lookup::registry::{Registries, TypeRegistry};
use crate::lookup::result::LookupResult;
use crate::lookup::table::{LookupTableBuilder, TableBinding};

type LiveMap<I> = DashMap<String, Arc<I>>;

/// Error messages of the requested tables, adapters and caches.
///
/// `None` means the instance is live and healthy. Names without a live
/// instance are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorStates {
    pub tables: BTreeMap<String, Option<String>>,
    pub data_adapters: BTreeMap<String, Option<String>>,
    pub caches: BTreeMap<String, Option<String>>,
}

/// Counts of live instances, reported by the health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveSummary {
    pub tables: usize,
    pub caches: usize,
    pub data_adapters: usize,
    /// Caches and adapters that are not running.
    pub not_running: usize,
}

pub struct LookupService {
    registries: Arc<Registries>,
    components: Arc<dyn ComponentRepository>,
    tables: Arc<dyn TableRepository>,
    live_caches: LiveMap<dyn LookupCache>,
    live_adapters: LiveMap<dyn LookupDataAdapter>,
    live_tables: DashMap<String, Arc<TableBinding>>,
    reconfigure: Mutex<()>,
}

impl LookupService {
    pub fn new(
        registries: Arc<Registries>,
        components: Arc<dyn ComponentRepository>,
        tables: Arc<dyn TableRepository>,
    ) -> Self {
        Self {
            registries,
            components,
            tables,
            live_caches: DashMap::new(),
            live_adapters: DashMap::new(),
            live_tables: DashMap::new(),
            reconfigure: Mutex::new(()),
        }
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Starts building a table view; see [`LookupTableBuilder`].
    pub fn new_builder(&self) -> LookupTableBuilder<'_> {
        LookupTableBuilder::new(self)
    }

    pub fn table(&self, name: &str) -> Option<Arc<TableBinding>> {
        self.live_tables.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn cache(&self, name: &str) -> Option<Arc<dyn LookupCache>> {
        self.live_caches.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn data_adapter(&self, name: &str) -> Option<Arc<dyn LookupDataAdapter>> {
        self.live_adapters.get(name).map(|e| Arc::clone(e.value()))
    }

    /// Live caches among `names`, in the given order; unknown names are skipped.
    pub fn get_caches(&self, names: &[String]) -> Vec<Arc<dyn LookupCache>> {
        names.iter().filter_map(|name| self.cache(name)).collect()
    }

    /// Live data adapters among `names`, in the given order; unknown names are skipped.
    pub fn get_data_adapters(&self, names: &[String]) -> Vec<Arc<dyn LookupDataAdapter>> {
        names
            .iter()
            .filter_map(|name| self.data_adapter(name))
            .collect()
    }

    /// Current error state of the named tables, adapters and caches.
    ///
    /// A table reports its adapter's error, or its cache's error if the
    /// adapter has none.
    pub fn error_states(
        &self,
        tables: &[String],
        data_adapters: &[String],
        caches: &[String],
    ) -> ErrorStates {
        let message = |e: Option<LookupError>| e.map(|e| e.to_string());
        let mut states = ErrorStates::default();

        for name in tables {
            let Some(binding) = self.table(name) else {
                continue;
            };
            let adapter_error = self
                .data_adapter(&binding.adapter_name)
                .and_then(|a| a.error());
            let cache_error = self.cache(&binding.cache_name).and_then(|c| c.error());
            states
                .tables
                .insert(name.clone(), message(adapter_error.or(cache_error)));
        }
        for adapter in self.get_data_adapters(data_adapters) {
            states
                .data_adapters
                .insert(adapter.name().to_string(), message(adapter.error()));
        }
        for cache in self.get_caches(caches) {
            states
                .caches
                .insert(cache.name().to_string(), message(cache.error()));
        }
        states
    }

    /// Fetches `key` from the named adapter directly, bypassing any cache.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotConfigured`] if no such adapter is live, or
    /// the adapter's own failure.
    pub async fn query_data_adapter(
        &self,
        name: &str,
        key: &LookupKey,
    ) -> Result<LookupResult, LookupError> {
        let adapter = self
            .data_adapter(name)
            .ok_or_else(|| LookupError::NotConfigured(format!("data adapter '{name}'")))?;
        adapter.get(key).await
    }

    /// Purges one key, or the whole cache when `key` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotConfigured`] if no such cache is live, or
    /// the cache's own failure.
    pub async fn purge_cache(&self, name: &str, key: Option<&LookupKey>) -> Result<(), LookupError> {
        let cache = self
            .cache(name)
            .ok_or_else(|| LookupError::NotConfigured(format!("cache '{name}'")))?;
        match key {
            Some(key) => cache.purge_key(key).await,
            None => cache.purge().await,
        }
    }

    pub fn live_summary(&self) -> LiveSummary {
        let not_running = self
            .live_caches
            .iter()
            .filter(|e| e.value().state() != ServiceState::Running)
            .count()
            + self
                .live_adapters
                .iter()
                .filter(|e| e.value().state() != ServiceState::Running)
                .count();

        LiveSummary {
            tables: self.live_tables.len(),
            caches: self.live_caches.len(),
            data_adapters: self.live_adapters.len(),
            not_running,
        }
    }

    /// Materializes every stored configuration and retires live instances
    /// whose records are gone.
    ///
    /// Instances whose configuration is unchanged and that are running are
    /// kept as they are.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the configuration cannot be read; live
    /// instances are left untouched in that case.
    pub async fn refresh_all(&self) -> Result<(), AppError> {
        let _guard = self.reconfigure.lock().await;

        let caches = self.components.list_all(ComponentKind::Cache).await?;
        let adapters = self.components.list_all(ComponentKind::DataAdapter).await?;
        let tables = self.tables.list_all().await?;

        for cache in &caches {
            materialize(&self.registries.caches, &self.live_caches, cache).await;
        }
        retire_missing(&self.live_caches, &caches).await;

        for adapter in &adapters {
            materialize(&self.registries.adapters, &self.live_adapters, adapter).await;
        }
        retire_missing(&self.live_adapters, &adapters).await;

        let names: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        self.live_tables.retain(|name, _| names.contains(name.as_str()));
        for table in &tables {
            self.live_tables
                .insert(table.name.clone(), Arc::new(TableBinding::from(table)));
        }

        info!(
            tables = self.live_tables.len(),
            caches = self.live_caches.len(),
            data_adapters = self.live_adapters.len(),
            "Lookup instances refreshed"
        );
        Ok(())
    }

    /// Applies one change notification to the live instances.
    ///
    /// Failures to read the changed records are logged; the affected live
    /// instances stay as they were.
    pub async fn handle_change(&self, event: &ChangeEvent) {
        let _guard = self.reconfigure.lock().await;

        for &id in &event.ids {
            let outcome = match (event.kind, event.action) {
                (ChangeKind::Cache, ChangeAction::Updated) => {
                    self.reload_component(ComponentKind::Cache, id).await
                }
                (ChangeKind::DataAdapter, ChangeAction::Updated) => {
                    self.reload_component(ComponentKind::DataAdapter, id).await
                }
                (ChangeKind::Table, ChangeAction::Updated) => self.reload_table(id).await,
                (ChangeKind::Cache, ChangeAction::Deleted) => {
                    retire(&self.live_caches, id).await;
                    Ok(())
                }
                (ChangeKind::DataAdapter, ChangeAction::Deleted) => {
                    retire(&self.live_adapters, id).await;
                    Ok(())
                }
                (ChangeKind::Table, ChangeAction::Deleted) => {
                    self.live_tables.retain(|_, binding| binding.id != id);
                    Ok(())
                }
            };

            if let Err(e) = outcome {
                error!(kind = ?event.kind, id, error = %e, "Failed to apply change");
            }
        }
    }

    async fn reload_component(&self, kind: ComponentKind, id: i64) -> Result<(), AppError> {
        let record = self.components.find_by_id(kind, id).await?;
        match (kind, record) {
            (ComponentKind::Cache, Some(c)) => {
                materialize(&self.registries.caches, &self.live_caches, &c).await
            }
            (ComponentKind::DataAdapter, Some(a)) => {
                materialize(&self.registries.adapters, &self.live_adapters, &a).await
            }
            // Deleted before the notification arrived.
            (ComponentKind::Cache, None) => retire(&self.live_caches, id).await,
            (ComponentKind::DataAdapter, None) => retire(&self.live_adapters, id).await,
        }
        Ok(())
    }

    async fn reload_table(&self, id: i64) -> Result<(), AppError> {
        match self.tables.find_by_id(id).await? {
            Some(table) => {
                self.live_tables
                    .retain(|name, binding| binding.id != id || *name == table.name);
                self.live_tables
                    .insert(table.name.clone(), Arc::new(TableBinding::from(&table)));
                info!(id, name = %table.name, "Lookup table materialized");
            }
            None => self.live_tables.retain(|_, binding| binding.id != id),
        }
        Ok(())
    }

    /// Stops every live instance and forgets all tables.
    pub async fn shutdown(&self) {
        let _guard = self.reconfigure.lock().await;

        self.live_tables.clear();
        for cache in drain(&self.live_caches) {
            stop_instance(cache.as_ref()).await;
        }
        for adapter in drain(&self.live_adapters) {
            stop_instance(adapter.as_ref()).await;
        }
        info!("Lookup service stopped");
    }
}

/// In-process delivery: the change is applied before `publish` returns.
#[async_trait]
impl ChangePublisher for LookupService {
    async fn publish(&self, event: ChangeEvent) {
        self.handle_change(&event).await;
    }
}

fn is_current<I: ?Sized + Lifecycle>(live: &I, component: &Component) -> bool {
    live.id() == component.id
        && live.core().config() == &component.config
        && live.state() == ServiceState::Running
}

/// Builds, starts and installs the live instance for `component`.
async fn materialize<I>(registry: &TypeRegistry<I>, live: &LiveMap<I>, component: &Component)
where
    I: ?Sized + Lifecycle + 'static,
{
    let existing = live.get(&component.name).map(|e| Arc::clone(e.value()));
    if existing.is_some_and(|instance| is_current(instance.as_ref(), component)) {
        return;
    }

    match registry.create(component.id, &component.name, component.config.clone()) {
        Ok(instance) => install(live, instance).await,
        Err(e) => {
            error!(
                id = component.id,
                name = %component.name,
                error = %e,
                "Cannot build {} instance", component.kind
            );
            retire(live, component.id).await;
        }
    }
}

/// Starts `instance`, swaps it in by name and stops what it replaced.
///
/// A failed start is still installed so that its error state is reportable.
async fn install<I>(live: &LiveMap<I>, instance: Arc<I>)
where
    I: ?Sized + Lifecycle,
{
    if let Err(e) = instance.start().await {
        warn!(name = %instance.name(), error = %e, "Installing instance that failed to start");
    }

    let name = instance.name().to_string();
    let id = instance.id();

    let mut replaced: Vec<Arc<I>> = live.insert(name.clone(), Arc::clone(&instance)).into_iter().collect();
    // The same record under its previous name (renamed).
    let renamed: Vec<String> = live
        .iter()
        .filter(|e| e.value().id() == id && *e.key() != name)
        .map(|e| e.key().clone())
        .collect();
    for old_name in renamed {
        if let Some((_, old)) = live.remove(&old_name) {
            replaced.push(old);
        }
    }

    info!(id, name = %name, state = %instance.state(), "Lookup instance materialized");

    for old in replaced {
        if !Arc::ptr_eq(&old, &instance) {
            stop_instance(old.as_ref()).await;
        }
    }
}

/// Removes and stops every live instance with record id `id`.
async fn retire<I>(live: &LiveMap<I>, id: i64)
where
    I: ?Sized + Lifecycle,
{
    let names: Vec<String> = live
        .iter()
        .filter(|e| e.value().id() == id)
        .map(|e| e.key().clone())
        .collect();

    for name in names {
        if let Some((_, old)) = live.remove(&name) {
            info!(id, name = %name, "Lookup instance retired");
            stop_instance(old.as_ref()).await;
        }
    }
}

async fn retire_missing<I>(live: &LiveMap<I>, records: &[Component])
where
    I: ?Sized + Lifecycle,
{
    let known: HashSet<(&str, i64)> = records.iter().map(|c| (c.name.as_str(), c.id)).collect();
    let stale: Vec<i64> = live
        .iter()
        .filter(|e| !known.contains(&(e.key().as_str(), e.value().id())))
        .map(|e| e.value().id())
        .collect();

    for id in stale {
        retire(live, id).await;
    }
}

fn drain<I: ?Sized>(live: &LiveMap<I>) -> Vec<Arc<I>> {
    let names: Vec<String> = live.iter().map(|e| e.key().clone()).collect();
    names
        .into_iter()
        .filter_map(|name| live.remove(&name).map(|(_, instance)| instance))
        .collect()
}

async fn stop_instance<I: ?Sized + Lifecycle>(instance: &I) {
    if let Err(e) = instance.stop().await {
        warn!(id = instance.id(), name = %instance.name(), error = %e, "Instance stopped uncleanly");
    }
}
