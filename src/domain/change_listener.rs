use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::change_event::ChangeNotice;
use crate::lookup::LookupService;

/// Applies change notifications to the node's live instances until the bus closes.
///
/// Missed notifications (receiver lagged behind, or the bus lost its
/// connection) trigger a full refresh, since the skipped events cannot be
/// recovered.
pub async fn run_change_listener(
    mut rx: broadcast::Receiver<ChangeNotice>,
    service: Arc<LookupService>,
) {
    loop {
        match rx.recv().await {
            Ok(ChangeNotice::Change(event)) => {
                debug!(?event, "Change notification received");
                service.handle_change(&event).await;
            }
            Ok(ChangeNotice::Resync) => {
                info!("Change bus requested a resync");
                refresh(&service).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Change listener lagged, refreshing all lookup instances");
                refresh(&service).await;
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("Change bus closed, listener stopping");
                break;
            }
        }
    }
}

async fn refresh(service: &LookupService) {
    if let Err(e) = service.refresh_all().await {
        warn!(error = %e, "Full refresh failed");
    }
}
