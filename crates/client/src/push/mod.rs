//! Push notifications and notification clicks.
//!
//! A push carrying JSON is turned into one OS-level [`Notification`]. Missing
//! or empty fields fall back to fixed defaults. Clicking a notification
//! focuses the first open window or, failing that, opens the start page.

use std::sync::Arc;

use async_trait::async_trait;
use mks_sw_core::{AppConfig, Error};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

use crate::clients::{ClientId, ClientKind, Clients};

/// Tag used when the payload does not name one.
pub const DEFAULT_TAG: &str = "notification";

/// Vibration pattern in milliseconds: buzz, pause, buzz.
pub const VIBRATE_PATTERN: [u32; 3] = [200, 100, 200];

/// Decoded push body. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    /// Any JSON value; only its truthiness matters.
    #[serde(default, rename = "requireInteraction")]
    pub require_interaction: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl PushPayload {
    /// Decode a raw push body.
    ///
    /// # Errors
    ///
    /// `Error::PayloadInvalid` if the bytes are not a JSON object of the
    /// expected shape.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::PayloadInvalid(e.to_string()))
    }
}

/// A notification as handed to the OS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub tag: String,
    pub require_interaction: bool,
    /// Opaque payload passed through to the click handler.
    pub data: Value,
}

/// Fallback values for fields a payload leaves out.
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl From<&AppConfig> for NotificationDefaults {
    fn from(config: &AppConfig) -> Self {
        Self {
            title: config.notification_title.clone(),
            body: config.notification_body.clone(),
            icon: config.notification_icon.clone(),
        }
    }
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl NotificationDefaults {
    /// Fill in a notification from a payload. Empty strings count as absent.
    pub fn apply(&self, payload: PushPayload) -> Notification {
        let text = |value: Option<String>, fallback: &str| {
            value.filter(|s| !s.is_empty()).unwrap_or_else(|| fallback.to_string())
        };

        Notification {
            title: text(payload.title, &self.title),
            body: text(payload.body, &self.body),
            icon: self.icon.clone(),
            badge: self.icon.clone(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            tag: text(payload.tag, DEFAULT_TAG),
            require_interaction: payload.require_interaction.as_ref().is_some_and(is_truthy),
            data: payload
                .data
                .filter(is_truthy)
                .unwrap_or_else(|| Value::Object(Default::default())),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Where notifications are displayed.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;

    async fn close(&self, notification: &Notification) -> Result<(), Error>;
}

/// In-memory notification tray.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    shown: RwLock<Vec<Notification>>,
    closed: RwLock<Vec<Notification>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything shown so far, oldest first.
    pub async fn shown(&self) -> Vec<Notification> {
        self.shown.read().await.clone()
    }

    pub async fn closed(&self) -> Vec<Notification> {
        self.closed.read().await.clone()
    }

    /// Most recently shown notification.
    pub async fn latest(&self) -> Option<Notification> {
        self.shown.read().await.last().cloned()
    }
}

#[async_trait]
impl NotificationSink for NotificationCenter {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(tag = %notification.tag, "showing notification: {}", notification.title);
        self.shown.write().await.push(notification.clone());
        Ok(())
    }

    async fn close(&self, notification: &Notification) -> Result<(), Error> {
        tracing::debug!(tag = %notification.tag, "closing notification");
        self.closed.write().await.push(notification.clone());
        Ok(())
    }
}

/// What a notification click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", content = "client", rename_all = "snake_case")]
pub enum ClickOutcome {
    Focused(ClientId),
    Opened(ClientId),
    /// No window to focus and the platform cannot open one.
    Unavailable,
}

/// Presents pushes and handles clicks on them.
pub struct PushPresenter {
    sink: Arc<dyn NotificationSink>,
    clients: Arc<dyn Clients>,
    defaults: NotificationDefaults,
    enabled: bool,
    start_url: Url,
}

impl PushPresenter {
    pub fn new(
        sink: Arc<dyn NotificationSink>, clients: Arc<dyn Clients>, defaults: NotificationDefaults, start_url: Url,
    ) -> Self {
        Self { sink, clients, defaults, enabled: true, start_url }
    }

    /// Decode and log pushes without showing them.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    /// Handle an inbound push.
    ///
    /// Returns the notification that was shown. An absent body, a body that
    /// does not decode, disabled notifications, or a sink failure all yield
    /// `None` and never an error.
    pub async fn on_push(&self, data: Option<&[u8]>) -> Option<Notification> {
        let bytes = data?;

        let payload = match PushPayload::decode(bytes) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("dropping push: {}", err);
                return None;
            }
        };

        let notification = self.defaults.apply(payload);

        if !self.enabled {
            tracing::info!(tag = %notification.tag, "notifications disabled, not showing: {}", notification.title);
            return None;
        }

        match self.sink.show(&notification).await {
            Ok(()) => Some(notification),
            Err(err) => {
                tracing::warn!("failed to show notification: {}", err);
                None
            }
        }
    }

    /// Close the notification, then focus the first window or open a new one.
    ///
    /// # Errors
    ///
    /// Propagates client enumeration, focus, and window-opening failures.
    pub async fn on_notification_click(&self, notification: &Notification) -> Result<ClickOutcome, Error> {
        if let Err(err) = self.sink.close(notification).await {
            tracing::warn!("failed to close notification: {}", err);
        }

        let windows = self.clients.match_all(Some(ClientKind::Window)).await?;
        if let Some(window) = windows.iter().find(|c| c.is_focusable()) {
            self.clients.focus(window.id).await?;
            tracing::debug!("focused {}", window.id);
            return Ok(ClickOutcome::Focused(window.id));
        }

        match self.clients.open_window(&self.start_url).await? {
            Some(id) => {
                tracing::debug!("opened {} at {}", id, self.start_url);
                Ok(ClickOutcome::Opened(id))
            }
            None => {
                tracing::warn!("no window to focus and opening windows is unsupported");
                Ok(ClickOutcome::Unavailable)
            }
        }
    }
}
