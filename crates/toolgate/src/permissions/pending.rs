//! Pending permission request tracking
//!
//! This module tracks permission requests whose caller is parked waiting for
//! a decision, keyed by request id, and delivers the decision through a
//! oneshot channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  request()  │ → Generate UUID, register sender, publish event
//! └──────┬──────┘
//!        │
//!        ├─ Pending: DashMap<String, oneshot::Sender<bool>>
//!        │
//!        ↓
//! ┌─────────────┐
//! │  resolve()  │ → Remove sender, send decision
//! └─────────────┘
//! ```
//!
//! The map is sharded, so resolving a request in one session never waits on
//! registrations in another.

use dashmap::DashMap;
use tokio::sync::oneshot;

/// Tracks permission requests awaiting a decision
#[derive(Default)]
pub struct PendingRequests {
    /// Map of request_id → decision sender
    inner: DashMap<String, oneshot::Sender<bool>>,
}

impl PendingRequests {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Register a pending request and return the receiver its caller waits on
    ///
    /// Registering an id that is already pending replaces the old entry; the
    /// old caller then observes a closed channel.
    pub fn register(&self, id: &str) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        self.inner.insert(id.to_string(), tx);
        rx
    }

    /// Deliver a decision to a pending request
    ///
    /// # Returns
    ///
    /// * `true` - The request was pending and its caller received the decision
    /// * `false` - No such pending request, or its caller already went away
    pub fn resolve(&self, id: &str, granted: bool) -> bool {
        match self.inner.remove(id) {
            Some((_, sender)) => sender.send(granted).is_ok(),
            None => false,
        }
    }

    /// Remove a pending request without delivering a decision
    pub fn unregister(&self, id: &str) {
        self.inner.remove(id);
    }

    /// Whether a request is still pending
    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Removes a pending entry when the waiting caller returns or is dropped
pub(crate) struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    id: String,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(pending: &'a PendingRequests, id: String) -> Self {
        Self { pending, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.unregister(&self.id);
    }
}
