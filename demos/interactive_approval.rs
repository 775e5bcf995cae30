//! Interactive approval: a UI answers permission requests as they arrive.
//!
//! This demo shows the request/response protocol an interactive front end
//! drives:
//! - `subscribe_requests()` to receive `permission_requested` events
//! - `grant()` for a one-time approval, `deny()` to refuse
//! - `grant_persistent()` to remember an approval for the rest of the session
//! - file-level vs directory-level persisted grants
//!
//! ## Run
//! ```sh
//! cargo run -p demos --example interactive_approval
//! ```

use std::time::Duration;

use serde_json::json;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use toolgate::prelude::*;

const SESSION: &str = "demo-session";

fn write(path: &str) -> CreatePermissionRequest {
    CreatePermissionRequest::new(SESSION, "write_file", "write", path)
        .description(format!("Write {}", path))
        .params(json!({ "file_path": path, "content": "..." }))
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
            .working_directory("/tmp/proj")
            .build(),
    )?;
    let scope = CancellationToken::new();

    // --- Simulated UI ---
    // Persist grants for anything under src/, approve README edits once,
    // deny everything else.
    let mut requests = service.subscribe_requests(&scope);
    let ui = service.clone();
    tokio::spawn(async move {
        while let Some(event) = requests.next().await {
            let request = event.payload;
            if request.path.starts_with("/tmp/proj/src") {
                println!("  [UI] ALWAYS ALLOW {} {}", request.action, request.path);
                ui.grant_persistent(request).await;
            } else if request.path.ends_with("README.md") {
                println!("  [UI] ALLOW ONCE   {} {}", request.action, request.path);
                ui.grant(request);
            } else {
                println!("  [UI] DENY         {} {}", request.action, request.path);
                ui.deny(request);
            }
        }
    });

    // --- Audit log of every decision ---
    let mut responses = service.subscribe_responses(&scope);
    tokio::spawn(async move {
        while let Some(event) = responses.next().await {
            println!(
                "  [audit] {} {} -> {}",
                event.event_type, event.payload.request.path, event.payload.granted
            );
        }
    });

    println!("=== One-time and persistent grants ===\n");

    for path in ["README.md", "README.md", "src", "src/main.rs", "src/util/fs.rs", "Cargo.lock"] {
        let granted = service.request(&scope, write(path)).await;
        println!("request write {:<16} granted={}\n", path, granted);
    }

    println!("=== File-level vs directory-level ===\n");

    // README.md was only granted once, so it is asked about every time.
    // src/ was persisted as a directory, so its descendants never ask.
    let grants = service.persisted_grants(SESSION).await;
    for grant in &grants {
        println!("persisted: {} {} {}", grant.tool_name, grant.action, grant.path);
    }

    println!("\n=== Unanswered request ===\n");

    // A UI that never answers: the caller's deadline denies.
    let silent = PermissionService::new(PermissionOptions::default())?;
    let granted = silent
        .request_with_timeout(&scope, write("notes.txt"), Duration::from_millis(200))
        .await;
    println!("request with timeout granted={}", granted);

    // Give the audit task a moment to drain before shutting down.
    tokio::time::sleep(Duration::from_millis(50)).await;
    scope.cancel();
    Ok(())
}
