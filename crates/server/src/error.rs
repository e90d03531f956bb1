//! Structured errors for the mks-sw server.
//!
//! Worker errors convert through `mks_sw_core::Error`; these cover what only
//! the tool layer can get wrong.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Tool-layer errors for the mks-sw server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., an unknown client id).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Output could not be produced (serialization, task failure).
    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::Internal(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err: McpError = ToolError::InvalidInput("no such client".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert_eq!(err.message, "no such client");

        let err: McpError = ToolError::Internal("join".into()).into();
        assert_eq!(err.code, ErrorCode(-32603));
    }
}
