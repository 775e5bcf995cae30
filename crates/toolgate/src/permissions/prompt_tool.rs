//! Delegated approval through a permission-prompt tool.
//!
//! A session can hand every permission decision to an external tool instead
//! of the built-in request/response protocol. The exchange follows the
//! `--permission-prompt-tool` convention of agent CLIs: the tool is
//! called with a JSON description of the request and answers with a JSON
//! object carrying a `behavior` of `allow` or `deny`.
//!
//! ```text
//! → {"id":"s1_write_file_write","session_id":"s1","tool_name":"write_file",
//!    "description":"...","action":"write","params":{...},"path":"a.txt"}
//! ← {"behavior":"allow"}
//! ← {"behavior":"deny","message":"not in this repo"}
//! ```
//!
//! Anything else denies: tool errors, error-flagged responses, invalid
//! JSON, a missing or non-string `behavior`, or an unknown value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::types::CreatePermissionRequest;
use crate::error::GateError;
use crate::tools::{Tool, ToolCall, ToolContext};

/// JSON payload sent to a permission-prompt tool as its input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptToolRequest {
    /// `<session>_<tool>_<action>`
    pub id: String,
    /// Session the request belongs to
    pub session_id: String,
    /// Tool asking for permission
    pub tool_name: String,
    /// Human-readable description
    pub description: String,
    /// Semantic verb
    pub action: String,
    /// Opaque call parameters
    pub params: Value,
    /// Target path as given by the caller
    pub path: String,
}

impl From<&CreatePermissionRequest> for PromptToolRequest {
    fn from(opts: &CreatePermissionRequest) -> Self {
        Self {
            id: format!("{}_{}_{}", opts.session_id, opts.tool_name, opts.action),
            session_id: opts.session_id.clone(),
            tool_name: opts.tool_name.clone(),
            description: opts.description.clone(),
            action: opts.action.clone(),
            params: opts.params.clone(),
            path: opts.path.clone(),
        }
    }
}

/// Decision returned by a permission-prompt tool
///
/// Serializes to the response shape a prompt tool is expected to produce.
///
/// # Example
///
/// ```
/// use toolgate::permissions::PromptDecision;
///
/// let json = serde_json::to_string(&PromptDecision::deny("read-only session")).unwrap();
/// assert_eq!(json, r#"{"behavior":"deny","message":"read-only session"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "behavior", rename_all = "lowercase")]
pub enum PromptDecision {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny {
        /// Optional reason
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl PromptDecision {
    /// Deny with a reason
    pub fn deny(message: impl Into<String>) -> Self {
        Self::Deny {
            message: Some(message.into()),
        }
    }

    /// Whether this decision grants the request
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Encode a request as a prompt tool's input string.
pub fn encode_prompt_request(opts: &CreatePermissionRequest) -> Result<String, GateError> {
    Ok(serde_json::to_string(&PromptToolRequest::from(opts))?)
}

/// Decode a prompt tool's response content.
pub fn decode_prompt_response(raw: &str) -> Result<PromptDecision, GateError> {
    let malformed = |reason: String| GateError::MalformedPromptResponse {
        reason,
        raw: raw.to_string(),
    };

    let value: Value =
        serde_json::from_str(raw).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;

    let behavior = value
        .get("behavior")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing or invalid 'behavior' field".to_string()))?;

    match behavior {
        "allow" => Ok(PromptDecision::Allow),
        "deny" => Ok(PromptDecision::Deny {
            message: value
                .get("message")
                .and_then(Value::as_str)
                .map(String::from),
        }),
        other => Err(malformed(format!("invalid behavior '{}'", other))),
    }
}

/// Interpret a prompt tool's response content as a grant or denial.
///
/// Malformed responses deny and are logged at error level.
pub fn parse_prompt_response(raw: &str) -> bool {
    match decode_prompt_response(raw) {
        Ok(PromptDecision::Allow) => {
            debug!(response = raw, "Permission granted by prompt tool");
            true
        }
        Ok(PromptDecision::Deny { message: Some(reason) }) => {
            info!(reason = %reason, "Permission denied by prompt tool");
            false
        }
        Ok(PromptDecision::Deny { message: None }) => {
            info!("Permission denied by prompt tool");
            false
        }
        Err(e) => {
            error!(error = %e, response = raw, "Failed to interpret prompt tool response");
            false
        }
    }
}

/// Ask a permission-prompt tool to decide a request.
///
/// Cancellation of `cancel` before the tool answers denies.
pub(crate) async fn call_prompt_tool(
    tool: &dyn Tool,
    cancel: &CancellationToken,
    opts: &CreatePermissionRequest,
) -> bool {
    let tool_name = tool.info().name;

    let input = match encode_prompt_request(opts) {
        Ok(input) => input,
        Err(e) => {
            error!(error = %e, "Failed to encode permission prompt request");
            return false;
        }
    };

    let call = ToolCall::new(
        format!("{}_permission_check", opts.session_id),
        tool_name.clone(),
        input,
    );
    let ctx = ToolContext::with_cancel(opts.session_id.clone(), cancel.clone());

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(
                session_id = %opts.session_id,
                tool = %tool_name,
                "Permission prompt tool cancelled"
            );
            return false;
        }
        result = tool.run(&ctx, call) => result,
    };

    match result {
        Err(e) => {
            error!(error = %e, tool = %tool_name, "Permission prompt tool execution failed");
            false
        }
        Ok(response) if response.is_error => {
            error!(
                error = %response.content,
                tool = %tool_name,
                "Permission prompt tool returned error"
            );
            false
        }
        Ok(response) => parse_prompt_response(&response.content),
    }
}
