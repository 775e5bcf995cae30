//! In-memory permission state.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::path::covers;
use super::pending::PendingRequests;
use super::types::PermissionRequest;
use crate::tools::Tool;

/// Per-session permission state.
#[derive(Default)]
struct SessionPermissions {
    auto_approve: bool,
    prompt_tool: Option<Arc<dyn Tool>>,
    grants: Vec<PermissionRequest>,
}

/// How a new request for a session has to be decided.
pub(crate) enum Route {
    /// Session is auto-approved.
    AutoApproved,
    /// Session delegates decisions to a prompt tool.
    Delegated(Arc<dyn Tool>),
    /// Persisted grants, then the pending-request protocol.
    Protocol,
}

/// Owner of all session permission state and the pending-request table.
///
/// Session state sits behind one reader/writer lock. Pending requests live
/// in their own concurrent map so resolutions never wait on it.
#[derive(Default)]
pub struct PermissionStore {
    sessions: RwLock<HashMap<String, SessionPermissions>>,
    pending: PendingRequests,
}

impl PermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a session as auto-approved.
    pub async fn set_auto_approve(&self, session_id: &str) {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .auto_approve = true;
    }

    /// Whether a session is auto-approved.
    pub async fn is_auto_approved(&self, session_id: &str) -> bool {
        self.sessions
            .read()
            .await
            .get(session_id)
            .is_some_and(|s| s.auto_approve)
    }

    /// Bind a delegated approval tool to a session, replacing any previous one.
    pub async fn set_delegated_tool(&self, session_id: &str, tool: Arc<dyn Tool>) {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .prompt_tool = Some(tool);
    }

    /// The delegated approval tool bound to a session, if any.
    pub async fn delegated_tool(&self, session_id: &str) -> Option<Arc<dyn Tool>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .and_then(|s| s.prompt_tool.clone())
    }

    /// Pick the decision route for a session under a single read lock.
    ///
    /// Auto-approval takes priority over a delegated tool.
    pub(crate) async fn route(&self, session_id: &str) -> Route {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(s) if s.auto_approve => Route::AutoApproved,
            Some(SessionPermissions {
                prompt_tool: Some(tool),
                ..
            }) => Route::Delegated(tool.clone()),
            _ => Route::Protocol,
        }
    }

    /// Remember a grant for the rest of the session.
    ///
    /// The request's path must already be normalized.
    pub async fn append_persisted_grant(&self, request: PermissionRequest) {
        debug!(
            session_id = %request.session_id,
            tool = %request.tool_name,
            action = %request.action,
            path = %request.path,
            "Persisting permission grant"
        );
        self.sessions
            .write()
            .await
            .entry(request.session_id.clone())
            .or_default()
            .grants
            .push(request);
    }

    /// Whether a persisted grant covers `path` for this tool and action.
    pub async fn find_persisted_grant(
        &self,
        session_id: &str,
        tool_name: &str,
        action: &str,
        path: &Path,
    ) -> bool {
        let sessions = self.sessions.read().await;
        let Some(session) = sessions.get(session_id) else {
            return false;
        };
        session.grants.iter().any(|grant| {
            grant.tool_name == tool_name
                && grant.action == action
                && covers(Path::new(&grant.path), path)
        })
    }

    /// Snapshot of a session's persisted grants in append order.
    pub async fn persisted_grants(&self, session_id: &str) -> Vec<PermissionRequest> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.grants.clone())
            .unwrap_or_default()
    }

    /// The pending-request table.
    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }
}
