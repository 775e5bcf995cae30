//! Toolgate - permission-gated tool execution for coding agents
//!
//! Toolgate mediates every side-effecting action an agent wants to take (a
//! file write, a shell command, an external MCP tool call) through a
//! request/approval protocol before the action runs.
//!
//! # Overview
//!
//! Toolgate provides:
//! - A permission service that decides requests from session policy or parks
//!   them until a subscriber grants or denies them
//! - Session-scoped auto-approval for headless and watch-mode runs
//! - Persisted grants that cover a path and everything beneath it
//! - Delegation of decisions to an external permission-prompt tool speaking
//!   the `{"behavior":"allow"|"deny"}` JSON convention
//! - A typed publish/subscribe broker for request and response events
//! - A wrapper that gates any [`Tool`](tools::Tool) behind a permission check
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//! - `permissions`: The permission service, its store and the delegated approval adapter
//! - `pubsub`: Event broker used to publish permission requests and responses
//! - `tools`: The tool abstraction shared by built-in and MCP tools
//! - `gated`: Permission-gated tool wrapper
//! - `headless`: Session setup for runs without an interactive approver
//! - `options`: Service configuration
//! - `error`: Error types and handling
//!
//! # Example
//!
//! ```rust
//! use toolgate::prelude::*;
//! use tokio_stream::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GateError> {
//!     let service = PermissionService::new(
//!         PermissionOptions::builder().working_directory("/tmp/proj").build(),
//!     )?;
//!     let scope = CancellationToken::new();
//!
//!     // A UI subscribes to requests and answers them
//!     let mut requests = service.subscribe_requests(&scope);
//!     let ui = service.clone();
//!     tokio::spawn(async move {
//!         while let Some(event) = requests.next().await {
//!             println!("{} wants to {} {}", event.payload.tool_name, event.payload.action, event.payload.path);
//!             ui.grant_persistent(event.payload).await;
//!         }
//!     });
//!
//!     // A tool asks before writing
//!     let opts = CreatePermissionRequest::new("session-1", "write_file", "write", "a.txt");
//!     service.check(&scope, opts).await?;
//!
//!     scope.cancel();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types and utilities
///
/// This module defines the `GateError` enum, which covers all error cases in the crate:
///
/// - `Config` - Invalid service configuration
/// - `PermissionDenied` - A gated tool call was not granted
/// - `ToolNotFound` / `InvalidToolName` - Permission-prompt tool setup failures
/// - `MalformedPromptResponse` - Unusable answer from a permission-prompt tool
/// - `ToolExecution` - Tool handler failures
/// - `JsonDecode` - JSON parsing errors (auto-converts from `serde_json::Error`)
/// - `Io` - Filesystem and I/O operations (auto-converts from `std::io::Error`)
pub mod error;

/// Tool abstraction
///
/// Key types:
/// - `Tool` - Trait implemented by every tool the agent can invoke
/// - `ToolInfo` - Name, description and input schema
/// - `ToolCall` / `ToolResponse` - One invocation and its result
/// - `ToolContext` - Session and cancellation scope of a call
pub mod tools;

/// Typed publish/subscribe broker
pub mod pubsub;

/// Permission management for side-effecting tool actions
///
/// See `PermissionService` for the decision engine and session policy API.
pub mod permissions;

/// Configuration options and builder
pub mod options;

/// Permission-gated tool wrapper
pub mod gated;

/// Permission setup for headless and watch-mode runs
pub mod headless;

// Prelude module for common imports
pub mod prelude {
    //! Common imports for toolgate users
    //!
    //! Use `use toolgate::prelude::*;` to import commonly used types.

    pub use crate::error::GateError;
    pub use crate::gated::GatedTool;
    pub use crate::headless::{HeadlessPermissions, filter_tools, resolve_prompt_tool};
    pub use crate::options::PermissionOptions;
    pub use crate::permissions::{
        CreatePermissionRequest, PermissionRequest, PermissionResponse, PermissionService,
    };
    pub use crate::pubsub::{Event, EventStream, EventType};
    pub use crate::tools::{Tool, ToolCall, ToolContext, ToolInfo, ToolResponse};
}
