//! Background and periodic sync hooks.
//!
//! Both signals do the same thing: tell every connected page to refresh its
//! prayer times. Delivery is best-effort and failures never propagate.

use std::sync::Arc;

use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::clients::{ClientKind, ClientMessage, Clients};

/// Tag of the one-shot background sync.
pub const SYNC_TAG: &str = "sync-prayer-times";

/// Tag of the recurring periodic sync.
pub const PERIODIC_SYNC_TAG: &str = "update-prayer-times";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SyncReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans the refresh message out to all current pages.
#[derive(Clone)]
pub struct SyncNotifier {
    clients: Arc<dyn Clients>,
}

impl SyncNotifier {
    pub fn new(clients: Arc<dyn Clients>) -> Self {
        Self { clients }
    }

    /// Handle a one-shot sync. `None` if the tag is not ours.
    pub async fn on_sync(&self, tag: &str) -> Option<SyncReport> {
        if tag != SYNC_TAG {
            tracing::debug!("ignoring sync tag {}", tag);
            return None;
        }
        Some(self.broadcast().await)
    }

    /// Handle a periodic sync. `None` if the tag is not ours.
    pub async fn on_periodic_sync(&self, tag: &str) -> Option<SyncReport> {
        if tag != PERIODIC_SYNC_TAG {
            tracing::debug!("ignoring periodic sync tag {}", tag);
            return None;
        }
        Some(self.broadcast().await)
    }

    /// Post `SYNC_PRAYER_TIMES` to every window client, queried fresh.
    pub async fn broadcast(&self) -> SyncReport {
        let clients = match self.clients.match_all(Some(ClientKind::Window)).await {
            Ok(clients) => clients,
            Err(err) => {
                tracing::warn!("background sync failed: {}", err);
                return SyncReport::default();
            }
        };

        let message = ClientMessage::SyncPrayerTimes;
        let results = join_all(clients.iter().map(|c| self.clients.post_message(c.id, &message))).await;

        let mut report = SyncReport::default();
        for (client, result) in clients.iter().zip(results) {
            match result {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!("sync message to {} dropped: {}", client.id, err);
                }
            }
        }

        tracing::debug!(delivered = report.delivered, failed = report.failed, "sync broadcast");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientHub, ClientId, ClientInfo};
    use async_trait::async_trait;
    use mks_sw_core::Error;
    use url::Url;

    fn origin() -> Url {
        Url::parse("http://localhost:8080/").unwrap()
    }

    #[tokio::test]
    async fn test_sync_reaches_every_client() {
        let hub = Arc::new(ClientHub::new());
        let (_a, mut rx_a) = hub.connect(origin(), ClientKind::Window).await;
        let (_b, mut rx_b) = hub.connect(origin(), ClientKind::Window).await;
        let notifier = SyncNotifier::new(hub.clone());

        let report = notifier.on_sync(SYNC_TAG).await.unwrap();
        assert_eq!(report, SyncReport { delivered: 2, failed: 0 });
        assert_eq!(rx_a.recv().await, Some(ClientMessage::SyncPrayerTimes));
        assert_eq!(rx_b.recv().await, Some(ClientMessage::SyncPrayerTimes));
    }

    #[tokio::test]
    async fn test_periodic_sync_same_action() {
        let hub = Arc::new(ClientHub::new());
        let (_a, mut rx) = hub.connect(origin(), ClientKind::Window).await;
        let notifier = SyncNotifier::new(hub.clone());

        let report = notifier.on_periodic_sync(PERIODIC_SYNC_TAG).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(rx.recv().await, Some(ClientMessage::SyncPrayerTimes));
    }

    #[tokio::test]
    async fn test_tags_are_not_interchangeable() {
        let hub = Arc::new(ClientHub::new());
        let (_a, mut rx) = hub.connect(origin(), ClientKind::Window).await;
        let notifier = SyncNotifier::new(hub.clone());

        assert!(notifier.on_sync(PERIODIC_SYNC_TAG).await.is_none());
        assert!(notifier.on_periodic_sync(SYNC_TAG).await.is_none());
        assert!(notifier.on_sync("other").await.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dead_client_does_not_block_others() {
        let hub = Arc::new(ClientHub::new());
        let (_a, rx_a) = hub.connect(origin(), ClientKind::Window).await;
        let (_b, mut rx_b) = hub.connect(origin(), ClientKind::Window).await;
        drop(rx_a);
        let notifier = SyncNotifier::new(hub.clone());

        let report = notifier.broadcast().await;
        assert_eq!(report, SyncReport { delivered: 1, failed: 1 });
        assert_eq!(rx_b.recv().await, Some(ClientMessage::SyncPrayerTimes));
    }

    #[tokio::test]
    async fn test_worker_clients_are_skipped() {
        let hub = Arc::new(ClientHub::new());
        let (_w, mut rx_worker) = hub.connect(origin(), ClientKind::Worker).await;
        let notifier = SyncNotifier::new(hub.clone());

        assert_eq!(notifier.on_sync(SYNC_TAG).await, Some(SyncReport::default()));
        assert!(rx_worker.try_recv().is_err());

        let (_p, mut rx_page) = hub.connect(origin(), ClientKind::Window).await;
        let report = notifier.broadcast().await;
        assert_eq!(report.delivered, 1);
        assert_eq!(rx_page.recv().await, Some(ClientMessage::SyncPrayerTimes));
        assert!(rx_worker.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_no_clients() {
        let notifier = SyncNotifier::new(Arc::new(ClientHub::new()));
        assert_eq!(notifier.broadcast().await, SyncReport::default());
    }

    struct BrokenClients;

    #[async_trait]
    impl Clients for BrokenClients {
        async fn match_all(&self, _kind: Option<ClientKind>) -> Result<Vec<ClientInfo>, Error> {
            Err(Error::Client("enumeration failed".into()))
        }

        async fn post_message(&self, _id: ClientId, _message: &ClientMessage) -> Result<(), Error> {
            unreachable!()
        }

        async fn focus(&self, _id: ClientId) -> Result<(), Error> {
            unreachable!()
        }

        async fn open_window(&self, _url: &Url) -> Result<Option<ClientId>, Error> {
            unreachable!()
        }

        async fn claim(&self, _version: &str) -> Result<usize, Error> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_enumeration_failure_is_swallowed() {
        let notifier = SyncNotifier::new(Arc::new(BrokenClients));
        assert_eq!(notifier.on_sync(SYNC_TAG).await, Some(SyncReport::default()));
    }
}
