use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::change_event::{ChangeEvent, ChangeNotice, ChangePublisher};

/// Broadcasts change notifications within the process.
#[derive(Clone)]
pub struct LocalChangeBus {
    tx: broadcast::Sender<ChangeNotice>,
}

impl LocalChangeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.tx.subscribe()
    }
}

impl Default for LocalChangeBus {
    fn default() -> Self {
        Self::new(super::BUS_CAPACITY)
    }
}

#[async_trait]
impl ChangePublisher for LocalChangeBus {
    async fn publish(&self, event: ChangeEvent) {
        if self.tx.send(ChangeNotice::Change(event)).is_err() {
            debug!("Change published with no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change_listener::run_change_listener;
    use crate::domain::entities::{ComponentKind, NewComponent};
    use crate::domain::repositories::ComponentRepository;
    use crate::infrastructure::persistence::InMemoryRepository;
    use crate::lookup::{LookupService, PluginConfig, Registries};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let bus = LocalChangeBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = ChangeEvent::updated(ComponentKind::Cache, 1);
        bus.publish(event.clone()).await;

        assert_eq!(first.recv().await.unwrap(), ChangeNotice::Change(event.clone()));
        assert_eq!(second.recv().await.unwrap(), ChangeNotice::Change(event));
    }

    #[tokio::test]
    async fn test_listener_applies_published_changes() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = Arc::new(LookupService::new(
            Arc::new(Registries::builtin()),
            repo.clone(),
            repo.clone(),
        ));
        let bus = LocalChangeBus::default();
        let listener = tokio::spawn(run_change_listener(bus.subscribe(), Arc::clone(&service)));

        let cache = ComponentRepository::create(
            repo.as_ref(),
            NewComponent {
                kind: ComponentKind::Cache,
                name: "c".into(),
                title: "C".into(),
                description: None,
                config: PluginConfig::new("memory"),
            },
        )
        .await
        .unwrap();
        bus.publish(ChangeEvent::updated(ComponentKind::Cache, cache.id))
            .await;

        tokio::time::timeout(Duration::from_secs(2), async {
            while service.cache("c").is_none() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("cache should be materialized by the listener");

        drop(bus);
        tokio::time::timeout(Duration::from_secs(2), listener)
            .await
            .expect("listener stops when the bus closes")
            .unwrap();
    }
}
