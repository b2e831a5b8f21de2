//! Configuration change notifications.
//!
//! Every successful create, update or delete of a table, cache or data adapter
//! publishes a [`ChangeEvent`]. Each node subscribes and hands the events to
//! its [`crate::lookup::LookupService`], which re-materializes the affected
//! live instances. The transport behind [`ChangePublisher`] is swappable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::entities::ComponentKind;

/// Which kind of configuration record changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Table,
    Cache,
    DataAdapter,
}

impl From<ComponentKind> for ChangeKind {
    fn from(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Cache => Self::Cache,
            ComponentKind::DataAdapter => Self::DataAdapter,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Created or updated: re-read the records and replace live instances.
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub action: ChangeAction,
    pub ids: Vec<i64>,
}

impl ChangeEvent {
    pub fn updated(kind: impl Into<ChangeKind>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            action: ChangeAction::Updated,
            ids: vec![id],
        }
    }

    pub fn deleted(kind: impl Into<ChangeKind>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            action: ChangeAction::Deleted,
            ids: vec![id],
        }
    }
}

/// What a node's change listener receives from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeNotice {
    Change(ChangeEvent),
    /// Notifications may have been lost; rebuild from the stored configuration.
    Resync,
}

/// Fire-and-forget sender of change notifications.
///
/// Delivery failures are logged by the implementation and never fail the
/// mutation that triggered them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChangePublisher: Send + Sync {
    async fn publish(&self, event: ChangeEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let event = ChangeEvent::deleted(ComponentKind::DataAdapter, 7);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"kind": "data_adapter", "action": "deleted", "ids": [7]})
        );
    }
}
