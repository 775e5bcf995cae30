//! Permission request, response and event types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pubsub::EventType;

/// A new permission request has been published and awaits a decision
pub const PERMISSION_REQUESTED: EventType = EventType::new("permission_requested");
/// A request was granted once
pub const PERMISSION_GRANTED: EventType = EventType::new("permission_granted");
/// A request was denied
pub const PERMISSION_DENIED: EventType = EventType::new("permission_denied");
/// A request was granted and remembered for the rest of the session
pub const PERMISSION_PERSISTED: EventType = EventType::new("permission_persisted");

/// Input to [`PermissionService::request`](super::PermissionService::request).
///
/// `path` may be relative; it is resolved against the service's working
/// directory before it is compared or published.
///
/// # Example
///
/// ```
/// use toolgate::permissions::CreatePermissionRequest;
/// use serde_json::json;
///
/// let opts = CreatePermissionRequest::new("session-1", "write_file", "write", "src/lib.rs")
///     .description("Write src/lib.rs")
///     .params(json!({ "content": "fn main() {}" }));
/// assert_eq!(opts.action, "write");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePermissionRequest {
    /// Session the request belongs to
    pub session_id: String,
    /// Tool asking for permission
    pub tool_name: String,
    /// Human-readable description
    pub description: String,
    /// Semantic verb, e.g. "write" or "execute"
    pub action: String,
    /// Opaque call parameters
    pub params: Value,
    /// Filesystem path the action targets
    pub path: String,
}

impl CreatePermissionRequest {
    /// Create a request with an empty description and null params
    pub fn new(
        session_id: impl Into<String>,
        tool_name: impl Into<String>,
        action: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            tool_name: tool_name.into(),
            description: String::new(),
            action: action.into(),
            params: Value::Null,
            path: path.into(),
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the opaque parameters
    pub fn params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

/// A pending decision point, as published to subscribers
///
/// `path` is always absolute and lexically cleaned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequest {
    /// Unique request id
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
    /// Normalized target path
    pub path: String,
}

impl PermissionRequest {
    pub(crate) fn from_create(id: String, opts: CreatePermissionRequest, path: String) -> Self {
        Self {
            id,
            session_id: opts.session_id,
            tool_name: opts.tool_name,
            description: opts.description,
            action: opts.action,
            params: opts.params,
            path,
        }
    }
}

/// Outcome of a request, published to response subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionResponse {
    /// The request that was resolved
    pub request: PermissionRequest,
    /// Whether it was granted
    pub granted: bool,
}
