//! The permission service: decision engine and session policy API.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::path::{clean, normalize};
use super::pending::PendingGuard;
use super::prompt_tool::{self, call_prompt_tool};
use super::store::{PermissionStore, Route};
use super::types::{
    CreatePermissionRequest, PERMISSION_DENIED, PERMISSION_GRANTED, PERMISSION_PERSISTED,
    PERMISSION_REQUESTED, PermissionRequest, PermissionResponse,
};
use crate::error::GateError;
use crate::options::PermissionOptions;
use crate::pubsub::{Broker, EventStream};
use crate::tools::Tool;

struct Inner {
    store: PermissionStore,
    requests: Broker<PermissionRequest>,
    responses: Broker<PermissionResponse>,
    working_directory: PathBuf,
}

/// Mediates every side-effecting tool action through a permission decision
///
/// Cloning is cheap; all clones share the same sessions, pending requests
/// and subscribers.
///
/// # Decision order
///
/// [`request`](Self::request) resolves a request by the first rule that
/// applies:
///
/// 1. The session is auto-approved: allow, nothing is published
/// 2. The session has a permission-prompt tool: the tool decides
/// 3. A persisted grant covers the tool, action and path: allow
/// 4. Otherwise the request is published and the caller waits for
///    [`grant`](Self::grant), [`deny`](Self::deny),
///    [`grant_persistent`](Self::grant_persistent) or cancellation
///
/// # Example
///
/// ```
/// use toolgate::options::PermissionOptions;
/// use toolgate::permissions::{CreatePermissionRequest, PermissionService};
/// use tokio_stream::StreamExt;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), toolgate::error::GateError> {
/// let service = PermissionService::new(
///     PermissionOptions::builder().working_directory("/repo").build(),
/// )?;
///
/// let scope = CancellationToken::new();
/// let mut requests = service.subscribe_requests(&scope);
///
/// let approver = service.clone();
/// tokio::spawn(async move {
///     if let Some(event) = requests.next().await {
///         approver.grant(event.payload);
///     }
/// });
///
/// let opts = CreatePermissionRequest::new("session-1", "write_file", "write", "src/lib.rs");
/// assert!(service.request(&scope, opts).await);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PermissionService {
    inner: Arc<Inner>,
}

impl PermissionService {
    /// Create a service
    ///
    /// # Errors
    ///
    /// * [`GateError::Config`] - The working directory is relative, or the
    ///   event buffer is zero
    /// * [`GateError::Io`] - No working directory was configured and the
    ///   process working directory cannot be read
    pub fn new(options: PermissionOptions) -> Result<Self, GateError> {
        if options.event_buffer == 0 {
            return Err(GateError::Config(
                "event_buffer must be greater than zero".to_string(),
            ));
        }

        let working_directory = match options.working_directory {
            Some(dir) if dir.is_absolute() => clean(&dir),
            Some(dir) => {
                return Err(GateError::Config(format!(
                    "working directory must be absolute, got {}",
                    dir.display()
                )));
            }
            None => clean(&std::env::current_dir()?),
        };

        debug!(
            working_directory = %working_directory.display(),
            event_buffer = options.event_buffer,
            "Permission service created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                store: PermissionStore::new(),
                requests: Broker::new(options.event_buffer),
                responses: Broker::new(options.event_buffer),
                working_directory,
            }),
        })
    }

    /// Directory relative request paths are resolved against
    pub fn working_directory(&self) -> &Path {
        &self.inner.working_directory
    }

    /// Resolve a request path against the working directory and clean it
    pub fn normalize_path(&self, path: &str) -> String {
        normalize(path, &self.inner.working_directory)
    }

    /// Decide whether an action may proceed
    ///
    /// Suspends until a decision is made or `cancel` fires. Every failure
    /// mode denies; this never errors.
    pub async fn request(&self, cancel: &CancellationToken, opts: CreatePermissionRequest) -> bool {
        match self.inner.store.route(&opts.session_id).await {
            Route::AutoApproved => {
                debug!(
                    session_id = %opts.session_id,
                    tool = %opts.tool_name,
                    "Session auto-approved, allowing"
                );
                return true;
            }
            Route::Delegated(tool) => {
                return call_prompt_tool(tool.as_ref(), cancel, &opts).await;
            }
            Route::Protocol => {}
        }

        let path = self.normalize_path(&opts.path);
        if self
            .inner
            .store
            .find_persisted_grant(&opts.session_id, &opts.tool_name, &opts.action, Path::new(&path))
            .await
        {
            debug!(
                session_id = %opts.session_id,
                tool = %opts.tool_name,
                path = %path,
                "Persisted grant matched, allowing"
            );
            return true;
        }

        let request = PermissionRequest::from_create(Uuid::new_v4().to_string(), opts, path);
        let request_id = request.id.clone();
        let tool = request.tool_name.clone();

        let pending = self.inner.store.pending();
        let response = pending.register(&request_id);
        let _guard = PendingGuard::new(pending, request_id.clone());

        debug!(request_id = %request_id, tool = %tool, "Awaiting permission decision");
        self.inner.requests.publish(PERMISSION_REQUESTED, request);

        tokio::select! {
            biased;
            result = response => match result {
                Ok(granted) => granted,
                Err(_) => {
                    warn!(
                        request_id = %request_id,
                        tool = %tool,
                        "Permission request dropped without a decision"
                    );
                    false
                }
            },
            _ = cancel.cancelled() => {
                warn!(
                    request_id = %request_id,
                    tool = %tool,
                    "Permission request timed out or was cancelled"
                );
                false
            }
        }
    }

    /// [`request`](Self::request) with a deadline
    ///
    /// The deadline cancels a child of `cancel`, so it behaves exactly like
    /// the caller cancelling: the request is denied and cleaned up.
    pub async fn request_with_timeout(
        &self,
        cancel: &CancellationToken,
        opts: CreatePermissionRequest,
        timeout: Duration,
    ) -> bool {
        let scope = cancel.child_token();
        let decision = self.request(&scope, opts);
        tokio::pin!(decision);

        tokio::select! {
            biased;
            granted = &mut decision => granted,
            _ = tokio::time::sleep(timeout) => {
                scope.cancel();
                decision.await
            }
        }
    }

    /// [`request`](Self::request) as a gate
    ///
    /// # Errors
    ///
    /// [`GateError::PermissionDenied`] when the request is not granted.
    pub async fn check(
        &self,
        cancel: &CancellationToken,
        opts: CreatePermissionRequest,
    ) -> Result<(), GateError> {
        if self.request(cancel, opts).await {
            Ok(())
        } else {
            Err(GateError::PermissionDenied)
        }
    }

    /// Grant a pending request once
    ///
    /// Returns whether a waiting caller received the decision. The
    /// `permission_granted` event is published either way.
    pub fn grant(&self, request: PermissionRequest) -> bool {
        self.resolve(request, true)
    }

    /// Deny a pending request
    ///
    /// Returns whether a waiting caller received the decision. The
    /// `permission_denied` event is published either way.
    pub fn deny(&self, request: PermissionRequest) -> bool {
        self.resolve(request, false)
    }

    fn resolve(&self, request: PermissionRequest, granted: bool) -> bool {
        let delivered = self.inner.store.pending().resolve(&request.id, granted);
        if !delivered {
            debug!(request_id = %request.id, "No waiting caller for permission decision");
        }

        let event_type = if granted {
            PERMISSION_GRANTED
        } else {
            PERMISSION_DENIED
        };
        self.inner
            .responses
            .publish(event_type, PermissionResponse { request, granted });
        delivered
    }

    /// Grant a request and remember it for the rest of the session
    ///
    /// Later requests from the same session for the same tool and action
    /// are allowed when their path equals the granted path or lies beneath
    /// it. Granting a file does not cover its siblings.
    pub async fn grant_persistent(&self, mut request: PermissionRequest) -> bool {
        request.path = self.normalize_path(&request.path);
        self.inner.store.append_persisted_grant(request.clone()).await;

        let delivered = self.inner.store.pending().resolve(&request.id, true);
        self.inner.responses.publish(
            PERMISSION_PERSISTED,
            PermissionResponse {
                request,
                granted: true,
            },
        );
        delivered
    }

    /// Allow every future request of a session without asking
    pub async fn auto_approve_session(&self, session_id: &str) {
        info!(session_id = %session_id, "Auto-approving session");
        self.inner.store.set_auto_approve(session_id).await;
    }

    /// Whether a session is auto-approved
    pub async fn is_auto_approved(&self, session_id: &str) -> bool {
        self.inner.store.is_auto_approved(session_id).await
    }

    /// Hand a session's decisions to a permission-prompt tool
    pub async fn set_permission_prompt_tool(&self, session_id: &str, tool: Arc<dyn Tool>) {
        info!(
            session_id = %session_id,
            tool = %tool.info().name,
            "Permission prompt tool configured"
        );
        self.inner.store.set_delegated_tool(session_id, tool).await;
    }

    /// The permission-prompt tool bound to a session, if any
    pub async fn permission_prompt_tool(&self, session_id: &str) -> Option<Arc<dyn Tool>> {
        self.inner.store.delegated_tool(session_id).await
    }

    /// Interpret a permission-prompt tool's response; malformed input denies
    pub fn parse_prompt_response(&self, content: &str) -> bool {
        prompt_tool::parse_prompt_response(content)
    }

    /// Stream of `permission_requested` events
    pub fn subscribe_requests(&self, scope: &CancellationToken) -> EventStream<PermissionRequest> {
        self.inner.requests.subscribe(scope)
    }

    /// Stream of granted, denied and persisted events
    pub fn subscribe_responses(
        &self,
        scope: &CancellationToken,
    ) -> EventStream<PermissionResponse> {
        self.inner.responses.subscribe(scope)
    }

    /// A session's persisted grants in the order they were made
    pub async fn persisted_grants(&self, session_id: &str) -> Vec<PermissionRequest> {
        self.inner.store.persisted_grants(session_id).await
    }

    /// Number of requests currently waiting for a decision
    pub fn pending_count(&self) -> usize {
        self.inner.store.pending().len()
    }
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService")
            .field("working_directory", &self.inner.working_directory)
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}
