//! Typed publish/subscribe broker
//!
//! A [`Broker`] fans every published [`Event`] out to all current
//! subscribers. Each subscriber owns a bounded channel; publishing never
//! waits on a subscriber.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  publish()   ┌────────────────────────────────┐
//! │  Publisher   │ ───────────→ │ Broker<T>                      │
//! └──────────────┘  try_send    │  DashMap<u64, mpsc::Sender>    │
//!                               └──────┬───────────────┬─────────┘
//!                                      ↓               ↓
//!                               EventStream<T>   EventStream<T>
//!                               (ends when its scope is cancelled)
//! ```
//!
//! A full subscriber buffer drops the event for that subscriber only. A
//! subscriber whose stream was dropped or whose scope was cancelled is pruned
//! on the next publish.
//!
//! # Example
//!
//! ```
//! use toolgate::pubsub::{Broker, EventType};
//! use tokio_stream::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! const GREETING: EventType = EventType::new("greeting");
//!
//! # #[tokio::main]
//! # async fn main() {
//! let broker = Broker::<String>::new(16);
//! let scope = CancellationToken::new();
//! let mut events = broker.subscribe(&scope);
//!
//! broker.publish(GREETING, "hello".to_string());
//!
//! let event = events.next().await.unwrap();
//! assert_eq!(event.event_type, GREETING);
//! assert_eq!(event.payload, "hello");
//!
//! scope.cancel();
//! assert!(events.next().await.is_none());
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use serde::{Serialize, Serializer};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, warn};

/// Default per-subscriber buffer capacity
pub const DEFAULT_BUFFER: usize = 64;

/// Name of an event kind
///
/// Serializes as its plain string name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventType(&'static str);

impl EventType {
    /// Create an event type from its wire name
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Wire name of the event type
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// A published event
#[derive(Debug, Clone, Serialize)]
pub struct Event<T> {
    /// Kind of event
    pub event_type: EventType,
    /// Event payload
    pub payload: T,
}

struct Subscriber<T> {
    tx: mpsc::Sender<Event<T>>,
    scope: CancellationToken,
}

/// Fan-out broker for events carrying payloads of type `T`
pub struct Broker<T> {
    subscribers: DashMap<u64, Subscriber<T>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl<T> Broker<T>
where
    T: Clone + Send + 'static,
{
    /// Create a broker whose subscribers each buffer up to `buffer` events
    ///
    /// A zero buffer is raised to one.
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(0),
            buffer: buffer.max(1),
        }
    }

    /// Subscribe to events published from now on
    ///
    /// The returned stream ends once `scope` is cancelled. Dropping the
    /// stream unsubscribes as well.
    pub fn subscribe(&self, scope: &CancellationToken) -> EventStream<T> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(
            id,
            Subscriber {
                tx,
                scope: scope.clone(),
            },
        );
        debug!(subscriber = id, "Subscriber added");

        EventStream {
            inner: ReceiverStream::new(rx),
            cancelled: Box::pin(scope.clone().cancelled_owned()),
            done: false,
        }
    }

    /// Publish an event to every subscriber without blocking
    pub fn publish(&self, event_type: EventType, payload: T) {
        if self.subscribers.is_empty() {
            return;
        }

        let event = Event {
            event_type,
            payload,
        };

        let mut closed = Vec::new();
        for entry in self.subscribers.iter() {
            let subscriber = entry.value();
            if subscriber.scope.is_cancelled() {
                closed.push(*entry.key());
                continue;
            }
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(
                        subscriber = *entry.key(),
                        event_type = %event_type,
                        "Subscriber buffer full, dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        for id in closed {
            self.subscribers.remove(&id);
            debug!(subscriber = id, "Subscriber removed");
        }
    }

    /// Number of live subscribers
    ///
    /// Subscribers that were dropped or whose scope was cancelled are only
    /// counted until the next publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<T> Default for Broker<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

/// Stream of events for one subscriber
///
/// Yields events in publish order and ends when the subscription scope is
/// cancelled.
pub struct EventStream<T> {
    inner: ReceiverStream<Event<T>>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    done: bool,
}

impl<T> Stream for EventStream<T> {
    type Item = Event<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        if self.cancelled.as_mut().poll(cx).is_ready() {
            self.done = true;
            self.inner.close();
            return Poll::Ready(None);
        }

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
