//! Integration tests for toolgate
//!
//! These tests drive the public API the way a host application does: tools
//! ask for permission, a simulated UI answers through the event streams, and
//! headless runs hand decisions to an MCP permission-prompt tool.
//!
//! # Test Structure
//!
//! - **Interactive Approval**: Request/grant/deny through subscriptions
//! - **Persisted Grants**: File-level vs directory-level grants
//! - **Delegated Approval**: Permission-prompt tool round-trips
//! - **Gated Tools**: Tools wrapped behind a permission check
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test integration
//! ```

#![cfg(unix)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use toolgate::headless::{HeadlessPermissions, watch_session};
use toolgate::permissions::{
    PERMISSION_DENIED, PERMISSION_GRANTED, PERMISSION_PERSISTED, PERMISSION_REQUESTED,
    PromptToolRequest,
};
use toolgate::prelude::*;

// ============================================================================
// Helper Functions
// ============================================================================

fn service(working_directory: &str) -> PermissionService {
    PermissionService::new(
        PermissionOptions::builder()
            .working_directory(working_directory)
            .build(),
    )
    .unwrap()
}

fn write_request(session: &str, path: &str) -> CreatePermissionRequest {
    CreatePermissionRequest::new(session, "write_file", "write", path)
        .description(format!("Write {path}"))
        .params(json!({ "file_path": path }))
}

/// Assert that the next published request comes from a fresh probe session,
/// proving nothing was published before it
async fn assert_nothing_published(
    service: &PermissionService,
    requests: &mut EventStream<PermissionRequest>,
) {
    let probe = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .request(&CancellationToken::new(), write_request("probe", "probe.txt"))
                .await
        })
    };
    let first = requests.next().await.unwrap();
    assert_eq!(first.payload.session_id, "probe");
    service.deny(first.payload);
    assert!(!probe.await.unwrap());
}

/// An MCP-style approval tool that records every request it is asked about
struct RecordingApprover {
    name: &'static str,
    reply: &'static str,
    seen: std::sync::Mutex<Vec<PromptToolRequest>>,
}

impl RecordingApprover {
    fn new(name: &'static str, reply: &'static str) -> Self {
        Self {
            name,
            reply,
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Tool for RecordingApprover {
    fn info(&self) -> ToolInfo {
        ToolInfo::new(self.name, "Approve or deny permission requests")
    }

    async fn run(&self, _ctx: &ToolContext, call: ToolCall) -> Result<ToolResponse, GateError> {
        let request: PromptToolRequest = serde_json::from_str(&call.input)?;
        self.seen.lock().unwrap().push(request);
        Ok(ToolResponse::text(self.reply))
    }
}

/// A side-effecting tool that counts how often it actually ran
struct Shell {
    runs: AtomicUsize,
}

#[async_trait]
impl Tool for Shell {
    fn info(&self) -> ToolInfo {
        ToolInfo::new("bash", "Run a shell command")
            .with_parameters(json!({ "command": { "type": "string" } }))
            .with_required(vec!["command".to_string()])
    }

    async fn run(&self, _ctx: &ToolContext, call: ToolCall) -> Result<ToolResponse, GateError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let input: Value = serde_json::from_str(&call.input)?;
        Ok(ToolResponse::text(format!("ran {}", input["command"])))
    }
}

// ============================================================================
// Interactive Approval
// ============================================================================

#[tokio::test]
async fn test_request_is_published_and_granted() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);
    let mut responses = service.subscribe_responses(&scope);

    let caller = {
        let service = service.clone();
        let scope = scope.clone();
        tokio::spawn(async move { service.request(&scope, write_request("S1", "a.txt")).await })
    };

    let event = requests.next().await.unwrap();
    assert_eq!(event.event_type, PERMISSION_REQUESTED);
    assert_eq!(event.payload.session_id, "S1");
    assert_eq!(event.payload.path, "/tmp/proj/a.txt");

    assert!(service.grant(event.payload.clone()));
    assert!(caller.await.unwrap());

    let response = responses.next().await.unwrap();
    assert_eq!(response.event_type, PERMISSION_GRANTED);
    assert_eq!(response.payload.request, event.payload);
    assert!(response.payload.granted);
}

#[tokio::test]
async fn test_late_resolution_does_not_change_outcome() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);
    let mut responses = service.subscribe_responses(&scope);

    let caller = {
        let service = service.clone();
        let scope = scope.clone();
        tokio::spawn(async move { service.request(&scope, write_request("S1", "a.txt")).await })
    };

    let request = requests.next().await.unwrap().payload;
    assert!(service.deny(request.clone()));
    assert!(!service.grant(request.clone()));
    assert!(!caller.await.unwrap());

    // Both resolutions are still observable
    assert_eq!(responses.next().await.unwrap().event_type, PERMISSION_DENIED);
    assert_eq!(responses.next().await.unwrap().event_type, PERMISSION_GRANTED);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_request_times_out() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);

    let granted = service
        .request_with_timeout(&scope, write_request("S1", "a.txt"), Duration::from_secs(60))
        .await;
    assert!(!granted);

    let request = requests.next().await.unwrap().payload;
    assert!(!service.grant(request));
    assert_eq!(service.pending_count(), 0);
}

#[tokio::test]
async fn test_cancelled_subscription_ends_stream() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);

    scope.cancel();
    assert!(requests.next().await.is_none());
}

// ============================================================================
// Persisted Grants
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_file_grant_does_not_cover_sibling_file() {
    let service = service("/");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);
    let mut responses = service.subscribe_responses(&scope);

    let caller = {
        let service = service.clone();
        let scope = scope.clone();
        tokio::spawn(async move {
            service
                .request(&scope, write_request("S1", "/tmp/proj/a.txt"))
                .await
        })
    };

    let event = requests.next().await.unwrap();
    assert_eq!(event.payload.path, "/tmp/proj/a.txt");
    assert!(service.grant_persistent(event.payload).await);
    assert!(caller.await.unwrap());
    assert_eq!(responses.next().await.unwrap().event_type, PERMISSION_PERSISTED);

    // Same file again: covered, nothing published
    assert!(service.request(&scope, write_request("S1", "/tmp/proj/a.txt")).await);

    // Sibling file: falls through to the protocol again
    let granted = service
        .request_with_timeout(&scope, write_request("S1", "/tmp/proj/b.txt"), Duration::from_secs(5))
        .await;
    assert!(!granted);
    let fallthrough = requests.next().await.unwrap();
    assert_eq!(fallthrough.payload.path, "/tmp/proj/b.txt");
}

#[tokio::test]
async fn test_directory_grant_covers_descendants() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);

    let caller = {
        let service = service.clone();
        let scope = scope.clone();
        tokio::spawn(async move { service.request(&scope, write_request("S1", "src")).await })
    };

    let event = requests.next().await.unwrap();
    service.grant_persistent(event.payload).await;
    assert!(caller.await.unwrap());

    for path in ["src/main.rs", "/tmp/proj/src/nested/mod.rs", "./src/../src/lib.rs"] {
        assert!(
            service.request(&scope, write_request("S1", path)).await,
            "{path} should be covered"
        );
    }

    let grants = service.persisted_grants("S1").await;
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].path, "/tmp/proj/src");
}

// ============================================================================
// Delegated Approval
// ============================================================================

#[tokio::test]
async fn test_headless_run_delegates_to_prompt_tool() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);

    let approver = Arc::new(RecordingApprover::new("approver_check", r#"{"behavior":"allow"}"#));
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(Shell {
            runs: AtomicUsize::new(0),
        }),
        approver.clone(),
    ];

    let setup = HeadlessPermissions::configure(&service, "S1", &tools, Some("mcp__approver__check"))
        .await
        .unwrap();
    let visible = setup.model_tools(tools, &[], &[]);
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].info().name, "bash");

    assert!(service.request(&scope, write_request("S1", "a.txt")).await);

    let seen = approver.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, "S1_write_file_write");
    assert_eq!(seen[0].path, "a.txt");
    assert_eq!(seen[0].params, json!({ "file_path": "a.txt" }));

    // Delegated decisions never go through the pending protocol
    assert_eq!(service.pending_count(), 0);
    assert_nothing_published(&service, &mut requests).await;
}

#[tokio::test]
async fn test_prompt_tool_denials_and_garbage_deny() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();

    let cases = [
        ("deny_with_reason", r#"{"behavior":"deny","message":"outside project"}"#),
        ("deny_plain", r#"{"behavior":"deny"}"#),
        ("not_json", "I think so?"),
        ("unknown", r#"{"behavior":"ask"}"#),
    ];
    for (session, reply) in cases {
        service
            .set_permission_prompt_tool(session, Arc::new(RecordingApprover::new("approver_check", reply)))
            .await;
        assert!(
            !service.request(&scope, write_request(session, "a.txt")).await,
            "{session} should deny"
        );
    }
}

#[tokio::test]
async fn test_unknown_prompt_tool_is_a_setup_error() {
    let service = service("/tmp/proj");
    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(RecordingApprover::new(
        "fs_read",
        r#"{"behavior":"allow"}"#,
    ))];

    let err = HeadlessPermissions::configure(&service, "S1", &tools, Some("mcp__approver__check"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "MCP tool mcp__approver__check (passed via --permission-prompt-tool) not found. \
         Available MCP tools: mcp__fs__read"
    );
    assert!(!service.is_auto_approved("S1").await);
}

#[tokio::test]
async fn test_watch_mode_never_publishes() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);

    watch_session(&service, "watch").await;
    assert!(service.request(&scope, write_request("watch", "/etc/hosts")).await);
    assert_nothing_published(&service, &mut requests).await;
}

// ============================================================================
// Gated Tools
// ============================================================================

#[tokio::test]
async fn test_gated_tool_runs_only_when_granted() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);

    let shell = Arc::new(Shell {
        runs: AtomicUsize::new(0),
    });
    let gated = Arc::new(GatedTool::new(shell.clone(), service.clone(), "execute"));

    let ui = service.clone();
    tokio::spawn(async move {
        let mut answered = 0;
        while let Some(event) = requests.next().await {
            if answered == 0 {
                ui.grant(event.payload);
            } else {
                ui.deny(event.payload);
            }
            answered += 1;
        }
    });

    let ctx = ToolContext::with_cancel("S1", scope.clone());
    let call = ToolCall::new("call-1", "bash", r#"{"command":"ls"}"#);
    let response = gated.run(&ctx, call.clone()).await.unwrap();
    assert_eq!(response.content, r#"ran "ls""#);

    let err = gated.run(&ctx, call).await.unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(shell.runs.load(Ordering::SeqCst), 1);

    scope.cancel();
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_cross_talk() {
    let service = service("/tmp/proj");
    let scope = CancellationToken::new();
    let mut requests = service.subscribe_requests(&scope);

    let mut callers = Vec::new();
    for i in 0..8 {
        let service = service.clone();
        let scope = scope.clone();
        callers.push(tokio::spawn(async move {
            service
                .check(&scope, write_request(&format!("session-{i}"), "shared.txt"))
                .await
        }));
    }

    let mut pending = Vec::new();
    for _ in 0..8 {
        pending.push(requests.next().await.unwrap().payload);
    }
    // Answer in an order unrelated to submission
    pending.sort_by(|a, b| b.id.cmp(&a.id));
    for request in pending {
        let index: usize = request.session_id["session-".len()..].parse().unwrap();
        if index % 3 == 0 {
            service.grant(request);
        } else {
            service.deny(request);
        }
    }

    for (i, caller) in callers.into_iter().enumerate() {
        let result = caller.await.unwrap();
        assert_eq!(result.is_ok(), i % 3 == 0, "session-{i}");
    }
}
