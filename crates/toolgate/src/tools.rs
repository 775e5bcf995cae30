//! Tool abstraction consumed by the permission core
//!
//! The permission core never knows what a tool does. It only needs to ask a
//! tool for its metadata and to run it with a JSON input string. Built-in
//! tools, MCP-server tools and delegated approval tools all implement the
//! same [`Tool`] trait.
//!
//! # Example
//!
//! ```
//! use toolgate::prelude::*;
//! use async_trait::async_trait;
//! use serde_json::json;
//!
//! struct EchoTool;
//!
//! #[async_trait]
//! impl Tool for EchoTool {
//!     fn info(&self) -> ToolInfo {
//!         ToolInfo::new("echo", "Echo the input back")
//!             .with_parameters(json!({ "message": { "type": "string" } }))
//!             .with_required(vec!["message".to_string()])
//!     }
//!
//!     async fn run(&self, _ctx: &ToolContext, call: ToolCall) -> Result<ToolResponse, GateError> {
//!         Ok(ToolResponse::text(call.input))
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::GateError;

/// Tool metadata
///
/// `parameters` is a JSON object describing the input properties and
/// `required` lists the property names the tool cannot run without.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name (unique among the tools offered to a model)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Input property schema
    pub parameters: Value,
    /// Names of required input properties
    pub required: Vec<String>,
}

impl ToolInfo {
    /// Create tool metadata with no parameters
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Value::Object(Default::default()),
            required: Vec::new(),
        }
    }

    /// Set the input property schema
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the required input properties
    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required = required;
        self
    }
}

/// A single invocation of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier
    pub id: String,
    /// Name of the tool being invoked
    pub name: String,
    /// JSON-encoded input
    pub input: String,
}

impl ToolCall {
    /// Create a tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input: input.into(),
        }
    }
}

/// Content type of a tool response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolResponseType {
    /// Text content
    #[default]
    Text,
    /// Base64-encoded image content
    Image,
}

/// Result of running a tool
///
/// A response with `is_error` set is a tool-level failure reported in-band
/// (the tool ran, but the outcome is an error message for the model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Content type
    #[serde(rename = "type")]
    pub response_type: ToolResponseType,
    /// Response content
    pub content: String,
    /// Optional tool-specific metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    /// Whether this response represents an error
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResponse {
    /// Create a text response
    ///
    /// # Example
    ///
    /// ```
    /// use toolgate::tools::ToolResponse;
    ///
    /// let response = ToolResponse::text(r#"{"behavior":"allow"}"#);
    /// assert!(!response.is_error);
    /// ```
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            response_type: ToolResponseType::Text,
            content: content.into(),
            metadata: None,
            is_error: false,
        }
    }

    /// Create an error response
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            response_type: ToolResponseType::Text,
            content: content.into(),
            metadata: None,
            is_error: true,
        }
    }

    /// Create an image response
    pub fn image(data: impl Into<String>) -> Self {
        Self {
            response_type: ToolResponseType::Image,
            content: data.into(),
            metadata: None,
            is_error: false,
        }
    }

    /// Attach metadata
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

/// Per-call context handed to a tool
///
/// Carries the session the call belongs to and the cancellation scope of the
/// call. Tools that block should race their work against `cancel`.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Session the call belongs to
    pub session_id: String,
    /// Cancellation scope of the call
    pub cancel: CancellationToken,
}

impl ToolContext {
    /// Create a context with a fresh cancellation scope
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a context bound to an existing cancellation scope
    pub fn with_cancel(session_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            session_id: session_id.into(),
            cancel,
        }
    }
}

/// A capability the agent can invoke
///
/// Implementations must be `Send + Sync` so a single tool can be shared
/// across sessions and bound as a delegated approval tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool metadata
    fn info(&self) -> ToolInfo;

    /// Run the tool
    ///
    /// # Returns
    ///
    /// * `Ok(ToolResponse)` - The tool ran; `is_error` may still be set
    /// * `Err(GateError)` - The tool could not run
    async fn run(&self, ctx: &ToolContext, call: ToolCall) -> Result<ToolResponse, GateError>;
}
