use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::constants::system;

/// Fan-out publisher for plan lifecycle events.
///
/// Every subscriber gets its own bounded channel. Publishing never blocks:
/// a full subscriber misses the event and a disconnected one is dropped.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    inner: Arc<PublisherInner>,
}

#[derive(Debug)]
struct PublisherInner {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<PublishedEvent>>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

/// Event that has been published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPublisherStats {
    pub published: u64,
    /// Deliveries lost because a subscriber's channel was full
    pub dropped: u64,
    pub subscribers: usize,
}

impl EventPublisher {
    /// Create a new event publisher with the specified per-subscriber capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                capacity: capacity.max(1),
                subscribers: Mutex::new(Vec::new()),
                published: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Publish an event with the given name and context
    pub fn publish(&self, event_name: impl Into<String>, context: Value) -> Result<(), PublishError> {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        let mut subscribers = self.inner.subscribers.lock();
        // Publishing with no listeners is fine
        subscribers.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        self.inner.published.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Publish a serializable payload as the event context
    pub fn publish_serialized<S: Serialize>(
        &self,
        event_name: impl Into<String>,
        payload: &S,
    ) -> Result<(), PublishError> {
        let context = serde_json::to_value(payload)?;
        self.publish(event_name, context)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> Receiver<PublishedEvent> {
        let (sender, receiver) = channel::bounded(self.inner.capacity);
        self.inner.subscribers.lock().push(sender);
        receiver
    }

    /// Subscribers still registered. Dropped receivers are pruned on the
    /// next publish.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn stats(&self) -> EventPublisherStats {
        EventPublisherStats {
            published: self.inner.published.load(Ordering::Relaxed),
            dropped: self.inner.dropped.load(Ordering::Relaxed),
            subscribers: self.subscriber_count(),
        }
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(system::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}
