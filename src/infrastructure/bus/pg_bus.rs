use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::domain::change_event::{ChangeEvent, ChangeNotice, ChangePublisher};

/// Change notifications over PostgreSQL `NOTIFY` on one channel.
///
/// Publishing goes through the shared pool; each subscribing node keeps one
/// dedicated listening connection.
pub struct PgChangeBus {
    pool: Arc<PgPool>,
    channel: String,
    local: broadcast::Sender<ChangeNotice>,
}

impl PgChangeBus {
    pub fn new(pool: Arc<PgPool>, channel: impl Into<String>) -> Self {
        let (local, _) = broadcast::channel(super::BUS_CAPACITY);
        Self {
            pool,
            channel: channel.into(),
            local,
        }
    }

    /// Starts listening on the channel and returns a receiver of the notices.
    ///
    /// The listening task runs for the rest of the process. After a lost
    /// connection it reconnects and emits [`ChangeNotice::Resync`], since
    /// notifications sent in between are gone.
    ///
    /// # Errors
    ///
    /// Returns the database error if the initial `LISTEN` fails.
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<ChangeNotice>, sqlx::Error> {
        let mut listener = PgListener::connect_with(self.pool.as_ref()).await?;
        listener.listen(&self.channel).await?;
        info!(channel = %self.channel, "Listening for lookup changes");

        let rx = self.local.subscribe();
        let tx = self.local.clone();
        let channel = self.channel.clone();

        tokio::spawn(async move {
            loop {
                match listener.try_recv().await {
                    Ok(Some(notification)) => {
                        match serde_json::from_str::<ChangeEvent>(notification.payload()) {
                            Ok(event) => {
                                debug!(?event, "Change notification received");
                                let _ = tx.send(ChangeNotice::Change(event));
                            }
                            Err(e) => warn!(
                                channel = %channel,
                                error = %e,
                                "Ignoring malformed change notification"
                            ),
                        }
                    }
                    Ok(None) => {
                        warn!(channel = %channel, "Change listener connection lost, reconnecting");
                        let _ = tx.send(ChangeNotice::Resync);
                    }
                    Err(e) => {
                        error!(channel = %channel, error = %e, "Change listener failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[async_trait]
impl ChangePublisher for PgChangeBus {
    async fn publish(&self, event: ChangeEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Cannot encode change notification");
                return;
            }
        };

        if let Err(e) = sqlx::query("SELECT pg_notify($1, $2)")
            .bind(&self.channel)
            .bind(&payload)
            .execute(self.pool.as_ref())
            .await
        {
            error!(channel = %self.channel, error = %e, "Failed to publish change notification");
        }
    }
}
