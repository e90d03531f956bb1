//! MCP tool implementations.
//!
//! Each inbound worker signal is one tool, plus page-client and cache tools.

pub mod cache;
pub mod clients;
pub mod fetch;
pub mod fetch_batch;
pub mod lifecycle;
pub mod push;
pub mod sync;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::Internal(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
