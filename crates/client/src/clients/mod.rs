//! Connected page clients.
//!
//! The worker never keeps its own membership list: every broadcast or
//! focus decision queries the current set through [`Clients`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use mks_sw_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use url::Url;

/// Messages a page can have waiting before new ones are dropped.
pub const MAILBOX_CAPACITY: usize = 32;

/// Identifier of a connected page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    /// A browsing context; the only kind that can be focused.
    Window,
    Worker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: ClientId,
    pub url: Url,
    pub kind: ClientKind,
    pub focused: bool,
    /// Cache version of the worker controlling this page, once claimed.
    pub controlled_by: Option<String>,
}

impl ClientInfo {
    pub fn is_focusable(&self) -> bool {
        self.kind == ClientKind::Window
    }
}

/// Messages the worker posts to pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Pages re-fetch prayer times from their own data layer.
    #[serde(rename = "SYNC_PRAYER_TIMES")]
    SyncPrayerTimes,
}

/// The set of pages the worker can reach.
#[async_trait]
pub trait Clients: Send + Sync {
    /// Current clients, optionally restricted to one kind, in connection order.
    async fn match_all(&self, kind: Option<ClientKind>) -> Result<Vec<ClientInfo>, Error>;

    async fn post_message(&self, id: ClientId, message: &ClientMessage) -> Result<(), Error>;

    async fn focus(&self, id: ClientId) -> Result<(), Error>;

    /// Open a new page. `Ok(None)` when the platform cannot open windows.
    async fn open_window(&self, url: &Url) -> Result<Option<ClientId>, Error>;

    /// Take control of every open page. Returns how many were claimed.
    async fn claim(&self, version: &str) -> Result<usize, Error>;
}

struct Slot {
    info: ClientInfo,
    tx: mpsc::Sender<ClientMessage>,
    /// Held until the host picks up a window the worker opened.
    pending_rx: Option<mpsc::Receiver<ClientMessage>>,
}

/// In-process client registry backed by bounded channels.
///
/// A page that stops reading loses new messages once its mailbox is full.
/// Slots live until [`ClientHub::disconnect`].
pub struct ClientHub {
    slots: RwLock<BTreeMap<ClientId, Slot>>,
    next_id: AtomicU64,
    can_open_windows: bool,
    capacity: usize,
}

impl Default for ClientHub {
    fn default() -> Self {
        Self {
            slots: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            can_open_windows: true,
            capacity: MAILBOX_CAPACITY,
        }
    }
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model a platform without window-opening capability.
    pub fn with_open_window(mut self, enabled: bool) -> Self {
        self.can_open_windows = enabled;
        self
    }

    /// Per-page mailbox size. Zero is raised to one.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    fn allocate(&self, url: Url, kind: ClientKind) -> (ClientId, Slot, mpsc::Receiver<ClientMessage>) {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.capacity);
        let info = ClientInfo { id, url, kind, focused: false, controlled_by: None };
        (id, Slot { info, tx, pending_rx: None }, rx)
    }

    /// Register a page and get the receiving end of its message channel.
    pub async fn connect(&self, url: Url, kind: ClientKind) -> (ClientId, mpsc::Receiver<ClientMessage>) {
        let (id, slot, rx) = self.allocate(url, kind);
        self.slots.write().await.insert(id, slot);
        tracing::debug!("{} connected", id);
        (id, rx)
    }

    /// Forget a page. Its queued messages are dropped with the slot.
    pub async fn disconnect(&self, id: ClientId) -> bool {
        let removed = self.slots.write().await.remove(&id).is_some();
        if removed {
            tracing::debug!("{} disconnected", id);
        }
        removed
    }

    /// Receiver for a window opened by the worker, handed out once.
    pub async fn take_receiver(&self, id: ClientId) -> Option<mpsc::Receiver<ClientMessage>> {
        self.slots.write().await.get_mut(&id).and_then(|slot| slot.pending_rx.take())
    }

    pub async fn get(&self, id: ClientId) -> Option<ClientInfo> {
        self.slots.read().await.get(&id).map(|slot| slot.info.clone())
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

#[async_trait]
impl Clients for ClientHub {
    async fn match_all(&self, kind: Option<ClientKind>) -> Result<Vec<ClientInfo>, Error> {
        let slots = self.slots.read().await;
        Ok(slots
            .values()
            .filter(|slot| kind.is_none_or(|k| slot.info.kind == k))
            .map(|slot| slot.info.clone())
            .collect())
    }

    async fn post_message(&self, id: ClientId, message: &ClientMessage) -> Result<(), Error> {
        let slots = self.slots.read().await;
        let slot = slots.get(&id).ok_or_else(|| Error::Client(format!("{id} is not connected")))?;
        slot.tx.try_send(message.clone()).map_err(|err| match err {
            TrySendError::Full(_) => Error::Client(format!("{id} mailbox is full")),
            TrySendError::Closed(_) => Error::Client(format!("{id} stopped listening")),
        })
    }

    async fn focus(&self, id: ClientId) -> Result<(), Error> {
        let mut slots = self.slots.write().await;
        match slots.get(&id) {
            Some(slot) if slot.info.is_focusable() => {}
            Some(_) => return Err(Error::Client(format!("{id} cannot be focused"))),
            None => return Err(Error::Client(format!("{id} is not connected"))),
        }
        for (slot_id, slot) in slots.iter_mut() {
            slot.info.focused = *slot_id == id;
        }
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<Option<ClientId>, Error> {
        if !self.can_open_windows {
            return Ok(None);
        }

        let (id, mut slot, rx) = self.allocate(url.clone(), ClientKind::Window);
        slot.pending_rx = Some(rx);

        let mut slots = self.slots.write().await;
        for other in slots.values_mut() {
            other.info.focused = false;
        }
        slot.info.focused = true;
        slots.insert(id, slot);
        tracing::debug!("{} opened at {}", id, url);
        Ok(Some(id))
    }

    async fn claim(&self, version: &str) -> Result<usize, Error> {
        let mut slots = self.slots.write().await;
        for slot in slots.values_mut() {
            slot.info.controlled_by = Some(version.to_string());
        }
        Ok(slots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(path: &str) -> Url {
        Url::parse("http://localhost:8080").unwrap().join(path).unwrap()
    }

    #[test]
    fn test_message_shape() {
        let json = serde_json::to_value(ClientMessage::SyncPrayerTimes).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "SYNC_PRAYER_TIMES" }));
    }

    #[tokio::test]
    async fn test_connect_and_post() {
        let hub = ClientHub::new();
        let (id, mut rx) = hub.connect(page("/"), ClientKind::Window).await;

        hub.post_message(id, &ClientMessage::SyncPrayerTimes).await.unwrap();
        assert_eq!(rx.recv().await, Some(ClientMessage::SyncPrayerTimes));
    }

    #[tokio::test]
    async fn test_post_to_dropped_receiver_fails() {
        let hub = ClientHub::new();
        let (id, rx) = hub.connect(page("/"), ClientKind::Window).await;
        drop(rx);

        assert!(hub.post_message(id, &ClientMessage::SyncPrayerTimes).await.is_err());
    }

    #[tokio::test]
    async fn test_match_all_order_and_filter() {
        let hub = ClientHub::new();
        let (a, _rx_a) = hub.connect(page("/"), ClientKind::Window).await;
        let (_w, _rx_w) = hub.connect(page("/js/worker.js"), ClientKind::Worker).await;
        let (b, _rx_b) = hub.connect(page("/quran.html"), ClientKind::Window).await;

        let all = hub.match_all(None).await.unwrap();
        assert_eq!(all.len(), 3);

        let windows: Vec<ClientId> = hub.match_all(Some(ClientKind::Window)).await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(windows, vec![a, b]);
    }

    #[tokio::test]
    async fn test_focus_is_exclusive() {
        let hub = ClientHub::new();
        let (a, _rx_a) = hub.connect(page("/"), ClientKind::Window).await;
        let (b, _rx_b) = hub.connect(page("/tasbih.html"), ClientKind::Window).await;

        hub.focus(a).await.unwrap();
        hub.focus(b).await.unwrap();
        assert!(!hub.get(a).await.unwrap().focused);
        assert!(hub.get(b).await.unwrap().focused);
    }

    #[tokio::test]
    async fn test_focus_worker_rejected() {
        let hub = ClientHub::new();
        let (w, _rx) = hub.connect(page("/js/worker.js"), ClientKind::Worker).await;
        assert!(hub.focus(w).await.is_err());
    }

    #[tokio::test]
    async fn test_open_window() {
        let hub = ClientHub::new();
        let id = hub.open_window(&page("/")).await.unwrap().unwrap();

        let info = hub.get(id).await.unwrap();
        assert!(info.focused);
        assert_eq!(info.kind, ClientKind::Window);
        assert!(hub.take_receiver(id).await.is_some());
        assert!(hub.take_receiver(id).await.is_none());
    }

    #[tokio::test]
    async fn test_open_window_unsupported() {
        let hub = ClientHub::new().with_open_window(false);
        assert_eq!(hub.open_window(&page("/")).await.unwrap(), None);
        assert!(hub.is_empty().await);
    }

    #[tokio::test]
    async fn test_claim() {
        let hub = ClientHub::new();
        let (a, _rx_a) = hub.connect(page("/"), ClientKind::Window).await;
        let (_b, _rx_b) = hub.connect(page("/hadith.html"), ClientKind::Window).await;

        assert_eq!(hub.claim("mks-muslim-v2").await.unwrap(), 2);
        assert_eq!(hub.get(a).await.unwrap().controlled_by.as_deref(), Some("mks-muslim-v2"));
    }

    #[tokio::test]
    async fn test_disconnect() {
        let hub = ClientHub::new();
        let (a, _rx) = hub.connect(page("/"), ClientKind::Window).await;
        assert!(hub.disconnect(a).await);
        assert!(!hub.disconnect(a).await);
        assert_eq!(hub.len().await, 0);
        assert!(hub.match_all(None).await.unwrap().is_empty());
        assert!(hub.post_message(a, &ClientMessage::SyncPrayerTimes).await.is_err());
    }

    #[tokio::test]
    async fn test_full_mailbox_drops_new_messages() {
        let hub = ClientHub::new().with_mailbox_capacity(2);
        let (id, mut rx) = hub.connect(page("/"), ClientKind::Window).await;

        hub.post_message(id, &ClientMessage::SyncPrayerTimes).await.unwrap();
        hub.post_message(id, &ClientMessage::SyncPrayerTimes).await.unwrap();
        let err = hub.post_message(id, &ClientMessage::SyncPrayerTimes).await.unwrap_err();
        assert!(err.to_string().contains("mailbox is full"));

        assert_eq!(rx.recv().await, Some(ClientMessage::SyncPrayerTimes));
        hub.post_message(id, &ClientMessage::SyncPrayerTimes).await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_opened_window_drops_pending_receiver() {
        let hub = ClientHub::new();
        let id = hub.open_window(&page("/")).await.unwrap().unwrap();
        assert!(hub.disconnect(id).await);
        assert!(hub.take_receiver(id).await.is_none());
    }
}
