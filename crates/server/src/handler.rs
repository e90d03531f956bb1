//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker.
use std::sync::Arc;

use mks_sw_client::{ClientHub, NotificationCenter, OfflineWorker};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::tools::cache::{CacheGetParams, CachePurgeParams, get_impl, purge_impl};
use crate::tools::clients::{
    ClientConnectParams, ClientDisconnectParams, ClientPollParams, Mailboxes, connect_impl, disconnect_impl, poll_impl,
};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::fetch_batch::{SwFetchBatchParams, fetch_batch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl};
use crate::tools::push::{SwNotificationClickParams, SwPushParams, click_impl, push_impl};
use crate::tools::sync::{SwSyncParams, sync_impl};

/// The main MCP server handler for mks-sw.
#[derive(Clone)]
pub struct MksSwServer {
    worker: Arc<OfflineWorker>,
    hub: Arc<ClientHub>,
    center: Arc<NotificationCenter>,
    mailboxes: Arc<Mailboxes>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl MksSwServer {
    /// Create a new server handler around a worker and the page/notification hosts it talks to.
    pub fn new(worker: Arc<OfflineWorker>, hub: Arc<ClientHub>, center: Arc<NotificationCenter>) -> Self {
        Self { worker, hub, center, mailboxes: Arc::new(Mailboxes::new()), tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: open the current cache store. Activates immediately when skip-waiting is set.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate the worker: delete every cache store but the current version and claim open pages.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Route one page request.
    ///
    /// GET requests are served network-first-external, cache-first or network-first
    /// depending on the URL; other methods go straight to the network.
    #[tool(description = "Issue a page request through the offline cache. Returns the response and which tier served it.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Issue several GET requests through the offline cache in parallel with bounded concurrency.")]
    async fn sw_fetch_batch(&self, params: Parameters<SwFetchBatchParams>) -> Result<CallToolResult, McpError> {
        fetch_batch_impl(self.worker.clone(), params.0).await
    }

    #[tool(description = "Deliver a background or periodic sync. Matching tags tell every page to refresh prayer times.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. A JSON payload is shown as a notification with defaults filled in.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Click a notification: focus the first open window, or open the start page.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.worker, &self.center, params.0).await
    }

    #[tool(description = "Connect a page to the worker. Returns its client id.")]
    async fn client_connect(&self, params: Parameters<ClientConnectParams>) -> Result<CallToolResult, McpError> {
        connect_impl(&self.worker, &self.hub, &self.mailboxes, params.0).await
    }

    #[tool(description = "Read the messages the worker posted to a page since the last poll.")]
    async fn client_poll(&self, params: Parameters<ClientPollParams>) -> Result<CallToolResult, McpError> {
        poll_impl(&self.hub, &self.mailboxes, params.0).await
    }

    #[tool(description = "Disconnect a page. Its client id and any unread messages are discarded.")]
    async fn client_disconnect(&self, params: Parameters<ClientDisconnectParams>) -> Result<CallToolResult, McpError> {
        disconnect_impl(&self.hub, &self.mailboxes, params.0).await
    }

    #[tool(description = "Read a cached response by URL, or list the entries of a cache store.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete a cached response by URL, or keep only the newest N entries of a store.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for MksSwServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mks-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
