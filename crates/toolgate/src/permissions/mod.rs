//! Permission management for side-effecting tool actions.
//!
//! Every file write, command execution or external tool call an agent wants
//! to perform is routed through a [`PermissionService`] before it runs. The
//! service decides from session policy where it can, and otherwise publishes
//! the request and parks the caller until a UI or other subscriber answers.
//!
//! # Architecture
//!
//! ```text
//!   tool ──request()──→ ┌──────────────────────────┐
//!                       │ PermissionService        │
//!                       │  1. auto-approved?  ─────┼──→ true
//!                       │  2. prompt tool?    ─────┼──→ tool decides (JSON)
//!                       │  3. persisted grant?─────┼──→ true
//!                       │  4. pending + publish    │
//!                       └──────┬────────────▲──────┘
//!              permission_requested       grant() / deny() / grant_persistent()
//!                              ↓            │
//!                       ┌───────────────────┴──────┐
//!                       │ Subscriber (UI, policy)  │
//!                       └──────────────────────────┘
//! ```
//!
//! Decisions are booleans and every failure denies: cancellation, a
//! malformed answer from a prompt tool, or a request dropped before it was
//! answered.
//!
//! # Persisted grants
//!
//! [`PermissionService::grant_persistent`] remembers a grant for the rest of
//! the session. Later requests for the same tool and action are allowed when
//! their path equals the granted path or is beneath it, compared component by
//! component. All paths are made absolute against the working directory and
//! cleaned lexically first (see [`path`]).
//!
//! # Example
//!
//! ```
//! use toolgate::options::PermissionOptions;
//! use toolgate::permissions::{CreatePermissionRequest, PermissionService};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), toolgate::error::GateError> {
//! let service = PermissionService::new(PermissionOptions::default())?;
//! service.auto_approve_session("ci-run").await;
//!
//! let scope = CancellationToken::new();
//! let opts = CreatePermissionRequest::new("ci-run", "bash", "execute", "");
//! assert!(service.request(&scope, opts).await);
//! # Ok(())
//! # }
//! ```

pub mod path;
mod pending;
mod prompt_tool;
mod service;
mod store;
mod types;

pub use pending::PendingRequests;
pub use prompt_tool::{
    PromptDecision, PromptToolRequest, decode_prompt_response, encode_prompt_request,
    parse_prompt_response,
};
pub use service::PermissionService;
pub use store::PermissionStore;
pub use types::{
    CreatePermissionRequest, PERMISSION_DENIED, PERMISSION_GRANTED, PERMISSION_PERSISTED,
    PERMISSION_REQUESTED, PermissionRequest, PermissionResponse,
};
