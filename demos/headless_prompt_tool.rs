//! Headless run: an MCP permission-prompt tool decides every request.
//!
//! This demo wires a session the way a non-interactive run does:
//! - `HeadlessPermissions::configure()` resolves `mcp__approver__check`
//! - the prompt tool is hidden from the tools offered to the model
//! - `GatedTool` asks before every call of a wrapped tool
//! - without a prompt tool the session is auto-approved instead
//!
//! ## Run
//! ```sh
//! cargo run -p demos --example headless_prompt_tool
//! ```

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use toolgate::permissions::path;
use toolgate::permissions::{PromptDecision, PromptToolRequest};
use toolgate::prelude::*;

const PROJECT_ROOT: &str = "/srv/app";

/// Requests carry the caller's raw path, so relative paths are resolved
/// against the project root first.
fn inside_project(raw: &str) -> bool {
    let root = Path::new(PROJECT_ROOT);
    path::covers(root, Path::new(&path::normalize(raw, root)))
}

/// Stand-in for an MCP server tool that reviews permission requests.
///
/// Allows reads and writes inside /srv/app, denies everything else.
struct Approver;

#[async_trait]
impl Tool for Approver {
    fn info(&self) -> ToolInfo {
        ToolInfo::new("approver_check", "Review a permission request")
    }

    async fn run(&self, _ctx: &ToolContext, call: ToolCall) -> Result<ToolResponse, GateError> {
        let request: PromptToolRequest = serde_json::from_str(&call.input)?;
        println!("  [approver] {} wants to {} '{}'", request.tool_name, request.action, request.path);

        let decision = if request.action == "execute" {
            PromptDecision::deny("shell access is disabled for this run")
        } else if request.path.is_empty() || inside_project(&request.path) {
            PromptDecision::Allow
        } else {
            PromptDecision::deny(format!("{} is outside {}", request.path, PROJECT_ROOT))
        };
        Ok(ToolResponse::text(serde_json::to_string(&decision)?))
    }
}

/// A tool with side effects the model may call.
struct Shell;

#[async_trait]
impl Tool for Shell {
    fn info(&self) -> ToolInfo {
        ToolInfo::new("bash", "Run a shell command")
            .with_parameters(json!({ "command": { "type": "string" } }))
            .with_required(vec!["command".to_string()])
    }

    async fn run(&self, _ctx: &ToolContext, call: ToolCall) -> Result<ToolResponse, GateError> {
        let input: Value = serde_json::from_str(&call.input)?;
        Ok(ToolResponse::text(format!("$ {}", input["command"])))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolgate=info".into()),
        )
        .with_target(false)
        .init();

    let service = PermissionService::new(
        PermissionOptions::builder()
            .working_directory(PROJECT_ROOT)
            .build(),
    )?;
    let scope = CancellationToken::new();

    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(Shell), Arc::new(Approver)];

    // --- 1. Delegated session ---
    println!("=== --permission-prompt-tool mcp__approver__check ===\n");

    let setup =
        HeadlessPermissions::configure(&service, "headless", &tools, Some("mcp__approver__check"))
            .await?;
    let visible = setup.model_tools(tools.clone(), &[], &[]);
    println!(
        "tools offered to the model: {:?}\n",
        visible.iter().map(|t| t.info().name).collect::<Vec<_>>()
    );

    for path in ["config/app.toml", "/etc/passwd"] {
        let opts = CreatePermissionRequest::new("headless", "write_file", "write", path);
        let granted = service.request(&scope, opts).await;
        println!("write {:<16} granted={}\n", path, granted);
    }

    let bash = GatedTool::new(Arc::new(Shell), service.clone(), "execute");
    let ctx = ToolContext::with_cancel("headless", scope.clone());
    match bash
        .run(&ctx, ToolCall::new("call-1", "bash", r#"{"command":"make"}"#))
        .await
    {
        Ok(response) => println!("bash -> {}\n", response.content),
        Err(e) => println!("bash -> {}\n", e),
    }

    // --- 2. Misconfigured prompt tool ---
    println!("=== --permission-prompt-tool mcp__missing__tool ===\n");

    if let Err(e) =
        HeadlessPermissions::configure(&service, "broken", &tools, Some("mcp__missing__tool")).await
    {
        println!("setup failed: {}\n", e);
    }

    // --- 3. No prompt tool: auto-approve ---
    println!("=== no prompt tool ===\n");

    HeadlessPermissions::configure(&service, "auto", &tools, None).await?;
    let ctx = ToolContext::with_cancel("auto", scope.clone());
    let response = bash
        .run(&ctx, ToolCall::new("call-2", "bash", r#"{"command":"make"}"#))
        .await?;
    println!("bash -> {}", response.content);

    scope.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate::permissions::{decode_prompt_response, encode_prompt_request};

    async fn decide(path: &str) -> PromptDecision {
        let opts = CreatePermissionRequest::new("s1", "write_file", "write", path);
        let input = encode_prompt_request(&opts).unwrap();
        let response = Approver
            .run(&ToolContext::new("s1"), ToolCall::new("c1", "approver_check", input))
            .await
            .unwrap();
        decode_prompt_response(&response.content).unwrap()
    }

    #[tokio::test]
    async fn test_relative_path_is_inside_project() {
        assert!(decide("config/app.toml").await.is_allow());
        assert!(decide("/srv/app/src/main.rs").await.is_allow());
    }

    #[tokio::test]
    async fn test_paths_outside_project_are_denied() {
        assert!(!decide("/etc/passwd").await.is_allow());
        assert!(!decide("../other/secret").await.is_allow());
        assert!(!decide("/srv/application").await.is_allow());
    }
}
