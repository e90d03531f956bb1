//! sw_sync tool implementation.

use mks_sw_client::OfflineWorker;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag: "sync-prayer-times" (one-shot) or "update-prayer-times" (periodic).
    pub tag: String,

    /// Deliver as a periodic sync rather than a one-shot sync (default: false).
    #[serde(default)]
    pub periodic: bool,
}

/// Output structure for sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncOutput {
    /// Whether the tag was recognised for this kind of sync.
    pub handled: bool,
    pub delivered: usize,
    pub failed: usize,
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(worker: &OfflineWorker, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let report = if params.periodic {
        worker.periodic_sync(&params.tag).await
    } else {
        worker.sync(&params.tag).await
    };

    let output = match report {
        Some(report) => SwSyncOutput { handled: true, delivered: report.delivered, failed: report.failed },
        None => SwSyncOutput { handled: false, delivered: 0, failed: 0 },
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{fixture, output};
    use mks_sw_client::{ClientKind, ClientMessage};

    #[tokio::test]
    async fn test_periodic_sync_broadcasts() {
        let f = fixture().await;
        let (_id, mut rx) = f.hub.connect(f.worker.resolve("/").unwrap(), ClientKind::Window).await;

        let params = SwSyncParams { tag: "update-prayer-times".into(), periodic: true };
        let out: SwSyncOutput = output(&sync_impl(&f.worker, params).await.unwrap());

        assert!(out.handled);
        assert_eq!(out.delivered, 1);
        assert_eq!(rx.recv().await, Some(ClientMessage::SyncPrayerTimes));
    }

    #[tokio::test]
    async fn test_unknown_tag_not_handled() {
        let f = fixture().await;
        let params = SwSyncParams { tag: "update-prayer-times".into(), periodic: false };
        let out: SwSyncOutput = output(&sync_impl(&f.worker, params).await.unwrap());
        assert!(!out.handled);
    }
}
