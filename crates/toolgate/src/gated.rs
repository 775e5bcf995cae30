//! Permission-gated tool wrapper
//!
//! [`GatedTool`] puts a [`PermissionService`] decision in front of any
//! [`Tool`]. The wrapped tool only runs when the request is granted; a denial
//! surfaces as [`GateError::PermissionDenied`] so callers can tell it apart
//! from the tool failing.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use toolgate::prelude::*;
//! use toolgate::gated::GatedTool;
//! use toolgate::options::PermissionOptions;
//! use toolgate::permissions::PermissionService;
//! use async_trait::async_trait;
//!
//! struct WriteFile;
//!
//! #[async_trait]
//! impl Tool for WriteFile {
//!     fn info(&self) -> ToolInfo {
//!         ToolInfo::new("write_file", "Write a file")
//!     }
//!
//!     async fn run(&self, _ctx: &ToolContext, call: ToolCall) -> Result<ToolResponse, GateError> {
//!         Ok(ToolResponse::text(format!("wrote {}", call.input)))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), GateError> {
//! let service = PermissionService::new(PermissionOptions::default())?;
//! service.auto_approve_session("s1").await;
//!
//! let tool = GatedTool::new(Arc::new(WriteFile), service, "write").with_path_field("path");
//! let call = ToolCall::new("call-1", "write_file", r#"{"path":"a.txt"}"#);
//! let response = tool.run(&ToolContext::new("s1"), call).await?;
//! assert!(!response.is_error);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::GateError;
use crate::permissions::{CreatePermissionRequest, PermissionService};
use crate::tools::{Tool, ToolCall, ToolContext, ToolInfo, ToolResponse};

/// A tool that asks for permission before every run
pub struct GatedTool {
    inner: Arc<dyn Tool>,
    permissions: PermissionService,
    action: String,
    path_field: Option<String>,
}

impl GatedTool {
    /// Gate `inner` behind `permissions`, requesting `action` for every call
    ///
    /// Without a path field the request targets the working directory.
    pub fn new(
        inner: Arc<dyn Tool>,
        permissions: PermissionService,
        action: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            permissions,
            action: action.into(),
            path_field: None,
        }
    }

    /// Read the target path from this string field of the call input
    pub fn with_path_field(mut self, field: impl Into<String>) -> Self {
        self.path_field = Some(field.into());
        self
    }

    /// The wrapped tool
    pub fn inner(&self) -> &Arc<dyn Tool> {
        &self.inner
    }

    fn permission_request(&self, session_id: &str, call: &ToolCall) -> CreatePermissionRequest {
        let tool_name = self.inner.info().name;
        let params = serde_json::from_str::<Value>(&call.input)
            .unwrap_or_else(|_| Value::String(call.input.clone()));
        let path = self
            .path_field
            .as_deref()
            .and_then(|field| params.get(field))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        CreatePermissionRequest::new(session_id, tool_name.as_str(), self.action.as_str(), path)
            .description(format!(
                "execute {} with the following parameters: {}",
                tool_name, call.input
            ))
            .params(params)
    }
}

#[async_trait]
impl Tool for GatedTool {
    fn info(&self) -> ToolInfo {
        self.inner.info()
    }

    async fn run(&self, ctx: &ToolContext, call: ToolCall) -> Result<ToolResponse, GateError> {
        let opts = self.permission_request(&ctx.session_id, &call);
        self.permissions.check(&ctx.cancel, opts).await?;

        debug!(call_id = %call.id, tool = %call.name, "Permission granted, running tool");
        self.inner.run(ctx, call).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::options::PermissionOptions;
    use crate::permissions::PERMISSION_REQUESTED;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_stream::StreamExt;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct CountingTool {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn info(&self) -> ToolInfo {
            ToolInfo::new("fs_write", "Write through an MCP server")
        }

        async fn run(&self, _ctx: &ToolContext, call: ToolCall) -> Result<ToolResponse, GateError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(ToolResponse::text(call.input))
        }
    }

    fn service() -> PermissionService {
        PermissionService::new(
            PermissionOptions::builder()
                .working_directory("/repo")
                .build(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_auto_approved_session_runs_inner_tool() {
        let service = service();
        service.auto_approve_session("s1").await;
        let inner = Arc::new(CountingTool::default());
        let tool = GatedTool::new(inner.clone(), service, "write");

        let response = tool
            .run(&ToolContext::new("s1"), ToolCall::new("c1", "fs_write", "{}"))
            .await
            .unwrap();

        assert_eq!(response.content, "{}");
        assert_eq!(inner.runs.load(Ordering::SeqCst), 1);
        assert_eq!(tool.info().name, "fs_write");
    }

    #[tokio::test]
    async fn test_denied_call_does_not_run() {
        let service = service();
        let scope = CancellationToken::new();
        let mut requests = service.subscribe_requests(&scope);
        let inner = Arc::new(CountingTool::default());
        let tool = Arc::new(
            GatedTool::new(inner.clone(), service.clone(), "write").with_path_field("path"),
        );

        let call = ToolCall::new("c1", "fs_write", r#"{"path":"notes/todo.md","text":"hi"}"#);
        let runner = {
            let tool = tool.clone();
            tokio::spawn(async move { tool.run(&ToolContext::new("s1"), call).await })
        };

        let event = requests.next().await.unwrap();
        assert_eq!(event.event_type, PERMISSION_REQUESTED);
        assert_eq!(event.payload.tool_name, "fs_write");
        assert_eq!(event.payload.action, "write");
        assert_eq!(event.payload.path, "/repo/notes/todo.md");
        assert_eq!(event.payload.params["text"], "hi");
        assert!(
            event
                .payload
                .description
                .starts_with("execute fs_write with the following parameters:")
        );

        service.deny(event.payload);
        let err = runner.await.unwrap().unwrap_err();
        assert!(matches!(err, GateError::PermissionDenied));
        assert_eq!(inner.runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_json_input_becomes_string_params() {
        let service = service();
        let tool = GatedTool::new(Arc::new(CountingTool::default()), service, "execute")
            .with_path_field("path");

        let opts = tool.permission_request("s1", &ToolCall::new("c1", "fs_write", "ls -la"));
        assert_eq!(opts.params, Value::String("ls -la".to_string()));
        assert!(opts.path.is_empty());
        assert_eq!(opts.session_id, "s1");
    }

    #[tokio::test]
    async fn test_cancelled_context_denies() {
        let service = service();
        let inner = Arc::new(CountingTool::default());
        let tool = GatedTool::new(inner.clone(), service, "write");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = ToolContext::with_cancel("s1", cancel);

        let err = tool
            .run(&ctx, ToolCall::new("c1", "fs_write", "{}"))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert_eq!(inner.runs.load(Ordering::SeqCst), 0);
    }
}
