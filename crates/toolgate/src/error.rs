//! Error types for the toolgate crate
//!
//! This module defines the error hierarchy for toolgate using `thiserror`.
//! Every fallible operation returns `Result<T, GateError>`.
//!
//! Note that permission *decisions* are never errors: [`request`] collapses
//! every outcome (including malformed delegated responses and cancellation)
//! into a boolean. Errors are reserved for setup problems and for reporting
//! a denied tool call back through a tool's own result channel.
//!
//! # Error Variants
//!
//! - [`GateError::Config`]: Invalid service configuration
//! - [`GateError::PermissionDenied`]: A gated action was not approved
//! - [`GateError::ToolNotFound`]: A named permission-prompt tool does not exist
//! - [`GateError::InvalidToolName`]: A permission-prompt tool name is not `mcp__{server}__{tool}`
//! - [`GateError::MalformedPromptResponse`]: A delegated approval tool answered with something unusable
//! - [`GateError::ToolExecution`]: A tool failed while running
//! - [`GateError::JsonDecode`]: JSON parsing errors (auto-converts from `serde_json::Error`)
//! - [`GateError::Io`]: Filesystem and I/O operations (auto-converts from `std::io::Error`)
//!
//! # Example
//!
//! ```rust
//! use toolgate::error::GateError;
//!
//! fn write_file(approved: bool) -> Result<(), GateError> {
//!     if !approved {
//!         return Err(GateError::PermissionDenied);
//!     }
//!     Ok(())
//! }
//!
//! assert!(matches!(write_file(false), Err(GateError::PermissionDenied)));
//! ```
//!
//! [`request`]: crate::permissions::PermissionService::request

use thiserror::Error;

/// The main error type for all toolgate operations
#[derive(Error, Debug)]
pub enum GateError {
    /// The permission service was configured with invalid options
    ///
    /// Returned by [`PermissionService::new`](crate::permissions::PermissionService::new)
    /// before any state is created.
    #[error("Invalid permission configuration: {0}")]
    Config(String),

    /// A gated action was not approved
    ///
    /// This is the sentinel a tool reports when its side effect was denied,
    /// distinct from [`GateError::ToolExecution`].
    #[error("permission denied")]
    PermissionDenied,

    /// The requested permission-prompt tool is not among the available tools
    #[error("MCP tool {name} (passed via --permission-prompt-tool) not found. Available MCP tools: {available}")]
    ToolNotFound {
        /// The tool name that was requested
        name: String,
        /// Comma-separated list of candidate tools, or "none"
        available: String,
    },

    /// A permission-prompt tool name does not follow `mcp__{server}__{tool}`
    #[error("invalid permission prompt tool format: {name} (expected: mcp__{{server}}__{{tool}})")]
    InvalidToolName {
        /// The rejected tool name
        name: String,
    },

    /// A delegated approval tool returned a response that could not be interpreted
    #[error("Malformed permission prompt response: {reason}")]
    MalformedPromptResponse {
        /// Description of what was wrong with the response
        reason: String,
        /// The raw response content
        raw: String,
    },

    /// Tool execution failed
    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    /// Failed to encode or decode JSON
    #[error("JSON error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GateError {
    /// Whether this error is the permission-denied sentinel
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, GateError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_message() {
        let err = GateError::PermissionDenied;
        assert_eq!(err.to_string(), "permission denied");
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_tool_execution_is_not_permission_denied() {
        let err = GateError::ToolExecution("disk full".to_string());
        assert_eq!(err.to_string(), "Tool execution failed: disk full");
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn test_tool_not_found_message() {
        let err = GateError::ToolNotFound {
            name: "mcp__approver__check".to_string(),
            available: "none".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "MCP tool mcp__approver__check (passed via --permission-prompt-tool) not found. Available MCP tools: none"
        );
    }

    #[test]
    fn test_invalid_tool_name_message() {
        let err = GateError::InvalidToolName {
            name: "approver".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid permission prompt tool format: approver (expected: mcp__{server}__{tool})"
        );
    }

    #[test]
    fn test_malformed_prompt_response_message() {
        let err = GateError::MalformedPromptResponse {
            reason: "missing behavior field".to_string(),
            raw: "{}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed permission prompt response: missing behavior field"
        );
    }

    #[test]
    fn test_config_message() {
        let err = GateError::Config("event_buffer must be greater than zero".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid permission configuration: event_buffer must be greater than zero"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GateError = io_err.into();
        assert!(matches!(err, GateError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_decode_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err: GateError = json_err.into();
        assert!(matches!(err, GateError::JsonDecode(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<GateError>();
        assert_sync::<GateError>();
    }
}
