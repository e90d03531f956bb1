//! sw_install and sw_activate tool implementations.

use mks_sw_client::{ActivationReport, InstallReport, OfflineWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output structure for sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwInstallOutput {
    pub install: InstallReport,
    /// Present when skip-waiting let activation run straight away.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation: Option<ActivationReport>,
}

/// Install the worker, activating immediately when skip-waiting is set.
pub async fn install_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let install = worker.install().await?;
    let activation = if install.skip_waiting { Some(worker.activate().await?) } else { None };

    json_result(&SwInstallOutput { install, activation })
}

/// Activate an installed worker.
pub async fn activate_impl(worker: &OfflineWorker) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    json_result(&report)
}
