//! sw_push and sw_notification_click tool implementations.

use mks_sw_client::{ClickOutcome, Notification, NotificationCenter, OfflineWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push body, normally a JSON object with optional `title`, `body`,
    /// `tag`, `requireInteraction` and `data`. Omit for a push without data.
    #[serde(default)]
    pub data: Option<String>,
}

/// Output structure for sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushOutput {
    pub shown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(worker: &OfflineWorker, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.push(params.data.as_deref().map(str::as_bytes)).await;
    json_result(&SwPushOutput { shown: notification.is_some(), notification })
}

/// Input parameters for sw_notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// The clicked notification. Defaults to the most recently shown one.
    #[serde(default)]
    pub notification: Option<Notification>,
}

/// Implementation of the sw_notification_click tool.
pub async fn click_impl(
    worker: &OfflineWorker, center: &NotificationCenter, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let notification = match params.notification {
        Some(notification) => notification,
        None => center
            .latest()
            .await
            .ok_or_else(|| ToolError::InvalidInput("no notification has been shown".into()))?,
    };

    let outcome: ClickOutcome = worker.notification_click(&notification).await?;
    json_result(&outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{fixture, output};
    use mks_sw_client::ClientKind;

    #[tokio::test]
    async fn test_push_shows_notification() {
        let f = fixture().await;
        let params = SwPushParams { data: Some(r#"{"title":"X","body":"Y"}"#.into()) };

        let out: SwPushOutput = output(&push_impl(&f.worker, params).await.unwrap());
        assert!(out.shown);
        let notification = out.notification.unwrap();
        assert_eq!(notification.tag, "notification");
        assert_eq!(f.center.shown().await, vec![notification]);
    }

    #[tokio::test]
    async fn test_push_without_data() {
        let f = fixture().await;
        let out: SwPushOutput = output(&push_impl(&f.worker, SwPushParams::default()).await.unwrap());
        assert!(!out.shown);
        assert!(out.notification.is_none());
    }

    #[tokio::test]
    async fn test_push_malformed() {
        let f = fixture().await;
        let params = SwPushParams { data: Some("{oops".into()) };
        let out: SwPushOutput = output(&push_impl(&f.worker, params).await.unwrap());
        assert!(!out.shown);
    }

    #[tokio::test]
    async fn test_click_without_notification() {
        let f = fixture().await;
        let result = click_impl(&f.worker, &f.center, SwNotificationClickParams::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_click_latest_focuses_window() {
        let f = fixture().await;
        let (page, _rx) = f.hub.connect(f.worker.resolve("/").unwrap(), ClientKind::Window).await;
        push_impl(&f.worker, SwPushParams { data: Some("{}".into()) }).await.unwrap();

        let result = click_impl(&f.worker, &f.center, SwNotificationClickParams::default()).await.unwrap();
        let outcome: ClickOutcome = output(&result);
        assert_eq!(outcome, ClickOutcome::Focused(page));
        assert_eq!(f.center.closed().await.len(), 1);
    }
}
