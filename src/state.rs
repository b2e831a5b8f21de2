//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::services::{AuthService, ComponentService, TableService};
use crate::domain::change_event::ChangePublisher;
use crate::domain::repositories::{ComponentRepository, TableRepository};
use crate::lookup::{LookupService, Registries};

#[derive(Clone)]
pub struct AppState {
    pub table_service: Arc<TableService>,
    pub component_service: Arc<ComponentService>,
    pub auth_service: Arc<AuthService>,
    /// Live tables, caches and adapters of this node.
    pub lookup: Arc<LookupService>,
}

impl AppState {
    /// Wires the management services over the given repositories.
    ///
    /// Mutations are announced through `publisher`; `lookup` must be fed by
    /// the same change stream (or be the publisher itself) to follow them.
    pub fn new(
        components: Arc<dyn ComponentRepository>,
        tables: Arc<dyn TableRepository>,
        registries: Arc<Registries>,
        publisher: Arc<dyn ChangePublisher>,
        lookup: Arc<LookupService>,
        auth_service: AuthService,
    ) -> Self {
        let component_service = ComponentService::new(
            Arc::clone(&components),
            Arc::clone(&tables),
            registries,
            Arc::clone(&publisher),
        );
        let table_service = TableService::new(tables, components, publisher);

        Self {
            table_service: Arc::new(table_service),
            component_service: Arc::new(component_service),
            auth_service: Arc::new(auth_service),
            lookup,
        }
    }
}
