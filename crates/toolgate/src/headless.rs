//! Permission setup for runs without an interactive approver
//!
//! A headless run has nobody to answer `permission_requested` events, so
//! each session is configured one of two ways before the agent starts:
//!
//! - **Delegated**: a `--permission-prompt-tool` name of the form
//!   `mcp__{server}__{tool}` selects an MCP tool that decides every request.
//!   The tool is hidden from the model's tool list.
//! - **Auto-approved**: without a prompt tool every request is allowed.
//!
//! Watch mode always auto-approves.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use toolgate::prelude::*;
//! use toolgate::headless::HeadlessPermissions;
//! use toolgate::options::PermissionOptions;
//! use toolgate::permissions::PermissionService;
//! use async_trait::async_trait;
//!
//! struct Approver;
//!
//! #[async_trait]
//! impl Tool for Approver {
//!     fn info(&self) -> ToolInfo {
//!         ToolInfo::new("approver_check", "Decide permission requests")
//!     }
//!
//!     async fn run(&self, _ctx: &ToolContext, _call: ToolCall) -> Result<ToolResponse, GateError> {
//!         Ok(ToolResponse::text(r#"{"behavior":"allow"}"#))
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), GateError> {
//! let service = PermissionService::new(PermissionOptions::default())?;
//! let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(Approver)];
//!
//! let setup =
//!     HeadlessPermissions::configure(&service, "s1", &tools, Some("mcp__approver__check")).await?;
//! assert_eq!(setup.excluded_tool(), Some("approver_check"));
//!
//! let visible = setup.model_tools(tools, &[], &[]);
//! assert!(visible.is_empty());
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::GateError;
use crate::permissions::PermissionService;
use crate::tools::Tool;

/// Prefix of externally visible MCP tool names
pub const MCP_PREFIX: &str = "mcp__";

/// Find the tool named by a `--permission-prompt-tool` argument
///
/// `mcp__{server}__{tool}` maps to the internal tool name `{server}_{tool}`.
/// Only tools whose names contain `_` are MCP tools and considered. When
/// several tools share the name, the last one wins.
///
/// # Returns
///
/// The tool and its internal name.
///
/// # Errors
///
/// * [`GateError::InvalidToolName`] - `name` does not start with `mcp__`
/// * [`GateError::ToolNotFound`] - No MCP tool has the internal name; the
///   error lists the available MCP tools in external form
pub fn resolve_prompt_tool(
    tools: &[Arc<dyn Tool>],
    name: &str,
) -> Result<(Arc<dyn Tool>, String), GateError> {
    let Some(rest) = name.strip_prefix(MCP_PREFIX) else {
        return Err(GateError::InvalidToolName {
            name: name.to_string(),
        });
    };
    let internal = rest.replacen("__", "_", 1);

    let mut found = None;
    let mut available = Vec::new();
    for tool in tools {
        let tool_name = tool.info().name;
        if !tool_name.contains('_') {
            continue;
        }
        available.push(format!("{}{}", MCP_PREFIX, tool_name.replacen('_', "__", 1)));
        if tool_name == internal {
            found = Some(Arc::clone(tool));
        }
    }

    match found {
        Some(tool) => {
            info!(tool = %internal, "Found permission prompt tool");
            Ok((tool, internal))
        }
        None => Err(GateError::ToolNotFound {
            name: name.to_string(),
            available: if available.is_empty() {
                "none".to_string()
            } else {
                available.join(", ")
            },
        }),
    }
}

/// Restrict the tools offered to the model
///
/// A non-empty `allowed` list keeps only the named tools and `excluded` is
/// ignored. Otherwise tools named in `excluded` are removed.
pub fn filter_tools(
    tools: Vec<Arc<dyn Tool>>,
    allowed: &[String],
    excluded: &[String],
) -> Vec<Arc<dyn Tool>> {
    if allowed.is_empty() && excluded.is_empty() {
        return tools;
    }

    let filtered: Vec<_> = if !allowed.is_empty() {
        let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
        tools
            .into_iter()
            .filter(|tool| allowed.contains(tool.info().name.as_str()))
            .collect()
    } else {
        let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
        tools
            .into_iter()
            .filter(|tool| !excluded.contains(tool.info().name.as_str()))
            .collect()
    };

    debug!(
        count = filtered.len(),
        tools = ?filtered.iter().map(|t| t.info().name).collect::<Vec<_>>(),
        "Using filtered tools"
    );
    filtered
}

/// How a headless session's permissions were configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlessPermissions {
    /// Every request is allowed
    AutoApproved,
    /// A permission-prompt tool decides every request
    Delegated {
        /// Internal name of the prompt tool
        tool_name: String,
    },
}

impl HeadlessPermissions {
    /// Configure a session for a headless run
    ///
    /// With `prompt_tool` the named MCP tool becomes the session's
    /// permission-prompt tool; otherwise the session is auto-approved.
    /// Nothing is changed when the tool cannot be resolved.
    pub async fn configure(
        service: &PermissionService,
        session_id: &str,
        tools: &[Arc<dyn Tool>],
        prompt_tool: Option<&str>,
    ) -> Result<Self, GateError> {
        match prompt_tool {
            Some(name) => {
                let (tool, tool_name) = resolve_prompt_tool(tools, name)?;
                service.set_permission_prompt_tool(session_id, tool).await;
                Ok(Self::Delegated { tool_name })
            }
            None => {
                service.auto_approve_session(session_id).await;
                Ok(Self::AutoApproved)
            }
        }
    }

    /// Tool that must be hidden from the model, if any
    pub fn excluded_tool(&self) -> Option<&str> {
        match self {
            Self::AutoApproved => None,
            Self::Delegated { tool_name } => Some(tool_name.as_str()),
        }
    }

    /// The tools to offer the model
    ///
    /// Applies [`filter_tools`] with the prompt tool added to `excluded`.
    pub fn model_tools(
        &self,
        tools: Vec<Arc<dyn Tool>>,
        allowed: &[String],
        excluded: &[String],
    ) -> Vec<Arc<dyn Tool>> {
        let mut excluded = excluded.to_vec();
        if let Some(name) = self.excluded_tool() {
            excluded.push(name.to_string());
        }
        filter_tools(tools, allowed, &excluded)
    }
}

/// Configure a session for watch mode, which never prompts
pub async fn watch_session(service: &PermissionService, session_id: &str) {
    service.auto_approve_session(session_id).await;
}
