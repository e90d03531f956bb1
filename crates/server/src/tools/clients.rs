//! client_connect, client_poll and client_disconnect tool implementations.
//!
//! A host stands in for page instances: it connects pages to the worker and
//! later polls the messages the worker posted to them.

use std::collections::HashMap;

use mks_sw_client::{ClientHub, ClientId, ClientKind, ClientMessage, OfflineWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};

use super::json_result;
use crate::error::ToolError;

/// Message receivers for connected pages, keyed by client id.
#[derive(Default)]
pub struct Mailboxes {
    receivers: Mutex<HashMap<ClientId, mpsc::Receiver<ClientMessage>>>,
}

impl Mailboxes {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, id: ClientId, rx: mpsc::Receiver<ClientMessage>) {
        self.receivers.lock().await.insert(id, rx);
    }

    async fn remove(&self, id: ClientId) -> bool {
        self.receivers.lock().await.remove(&id).is_some()
    }

    #[cfg(test)]
    async fn contains(&self, id: ClientId) -> bool {
        self.receivers.lock().await.contains_key(&id)
    }

    /// Drain pending messages for `id`, adopting windows the worker opened.
    async fn drain(&self, hub: &ClientHub, id: ClientId) -> Option<Vec<ClientMessage>> {
        let mut receivers = self.receivers.lock().await;
        if !receivers.contains_key(&id) {
            let rx = hub.take_receiver(id).await?;
            receivers.insert(id, rx);
        }

        let rx = receivers.get_mut(&id)?;
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        Some(messages)
    }
}

/// Input parameters for client_connect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientConnectParams {
    /// Page URL, absolute or relative to the app origin (default: "/").
    #[serde(default = "default_page")]
    pub url: String,

    /// "window" (default) or "worker".
    #[serde(default = "default_kind")]
    pub kind: ClientKind,
}

fn default_page() -> String {
    "/".into()
}

fn default_kind() -> ClientKind {
    ClientKind::Window
}

/// Output structure for client_connect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientConnectOutput {
    pub client: ClientId,
    pub url: String,
}

/// Implementation of the client_connect tool.
pub async fn connect_impl(
    worker: &OfflineWorker, hub: &ClientHub, mailboxes: &Mailboxes, params: ClientConnectParams,
) -> Result<CallToolResult, McpError> {
    let url = worker.resolve(&params.url)?;
    let (client, rx) = hub.connect(url.clone(), params.kind).await;
    mailboxes.insert(client, rx).await;

    json_result(&ClientConnectOutput { client, url: url.to_string() })
}

/// Input parameters for client_poll tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientPollParams {
    pub client: ClientId,
}

/// Output structure for client_poll tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientPollOutput {
    pub client: ClientId,
    pub focused: bool,
    /// Cache version controlling the page, once claimed.
    pub controlled_by: Option<String>,
    /// Messages received since the last poll, oldest first.
    pub messages: Vec<serde_json::Value>,
}

/// Implementation of the client_poll tool.
pub async fn poll_impl(
    hub: &ClientHub, mailboxes: &Mailboxes, params: ClientPollParams,
) -> Result<CallToolResult, McpError> {
    let id = params.client;
    let info = hub
        .get(id)
        .await
        .ok_or_else(|| ToolError::InvalidInput(format!("{id} is not connected")))?;

    let messages = mailboxes
        .drain(hub, id)
        .await
        .ok_or_else(|| ToolError::InvalidInput(format!("{id} has no mailbox")))?;

    let messages = messages
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ToolError::Internal(e.to_string()))?;

    json_result(&ClientPollOutput { client: id, focused: info.focused, controlled_by: info.controlled_by, messages })
}

/// Input parameters for client_disconnect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientDisconnectParams {
    pub client: ClientId,
}

/// Output structure for client_disconnect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientDisconnectOutput {
    pub client: ClientId,
    /// False when the client was not connected.
    pub disconnected: bool,
}

/// Implementation of the client_disconnect tool.
///
/// Removes the page from the worker's client set and drops its mailbox,
/// including any messages still queued.
pub async fn disconnect_impl(
    hub: &ClientHub, mailboxes: &Mailboxes, params: ClientDisconnectParams,
) -> Result<CallToolResult, McpError> {
    let id = params.client;
    let in_hub = hub.disconnect(id).await;
    let in_mailboxes = mailboxes.remove(id).await;

    json_result(&ClientDisconnectOutput { client: id, disconnected: in_hub || in_mailboxes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{fixture, output};
    use mks_sw_client::Clients;

    #[tokio::test]
    async fn test_connect_then_poll_sync_message() {
        let f = fixture().await;
        let mailboxes = Mailboxes::new();
        let params = ClientConnectParams { url: "/prayer-times.html".into(), kind: ClientKind::Window };

        let connected: ClientConnectOutput =
            output(&connect_impl(&f.worker, &f.hub, &mailboxes, params).await.unwrap());
        assert_eq!(connected.url, "http://localhost:8080/prayer-times.html");

        f.worker.sync("sync-prayer-times").await.unwrap();

        let poll = ClientPollParams { client: connected.client };
        let out: ClientPollOutput = output(&poll_impl(&f.hub, &mailboxes, poll.clone()).await.unwrap());
        assert_eq!(out.messages, vec![serde_json::json!({ "type": "SYNC_PRAYER_TIMES" })]);

        let again: ClientPollOutput = output(&poll_impl(&f.hub, &mailboxes, poll).await.unwrap());
        assert!(again.messages.is_empty());
    }

    #[tokio::test]
    async fn test_poll_unknown_client() {
        let f = fixture().await;
        let result = poll_impl(&f.hub, &Mailboxes::new(), ClientPollParams { client: ClientId(99) }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_removes_client_and_mailbox() {
        let f = fixture().await;
        let mailboxes = Mailboxes::new();
        let params = ClientConnectParams { url: "/".into(), kind: ClientKind::Window };
        let connected: ClientConnectOutput =
            output(&connect_impl(&f.worker, &f.hub, &mailboxes, params).await.unwrap());
        let id = connected.client;
        f.worker.sync("sync-prayer-times").await.unwrap();

        let out: ClientDisconnectOutput =
            output(&disconnect_impl(&f.hub, &mailboxes, ClientDisconnectParams { client: id }).await.unwrap());
        assert!(out.disconnected);
        assert!(f.hub.match_all(None).await.unwrap().is_empty());
        assert!(!mailboxes.contains(id).await);
        assert!(poll_impl(&f.hub, &mailboxes, ClientPollParams { client: id }).await.is_err());

        let again: ClientDisconnectOutput =
            output(&disconnect_impl(&f.hub, &mailboxes, ClientDisconnectParams { client: id }).await.unwrap());
        assert!(!again.disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_opened_window_after_poll() {
        let f = fixture().await;
        let mailboxes = Mailboxes::new();
        let id = f.hub.open_window(&f.worker.resolve("/").unwrap()).await.unwrap().unwrap();
        poll_impl(&f.hub, &mailboxes, ClientPollParams { client: id }).await.unwrap();
        assert!(mailboxes.contains(id).await);

        disconnect_impl(&f.hub, &mailboxes, ClientDisconnectParams { client: id }).await.unwrap();
        assert!(f.hub.get(id).await.is_none());
        assert!(!mailboxes.contains(id).await);
    }

    #[tokio::test]
    async fn test_poll_adopts_opened_window() {
        let f = fixture().await;
        let mailboxes = Mailboxes::new();
        let url = f.worker.resolve("/").unwrap();
        let id = f.hub.open_window(&url).await.unwrap().unwrap();

        let out: ClientPollOutput =
            output(&poll_impl(&f.hub, &mailboxes, ClientPollParams { client: id }).await.unwrap());
        assert!(out.focused);
        assert!(out.messages.is_empty());
    }
}
