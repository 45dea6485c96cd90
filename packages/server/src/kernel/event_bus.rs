//! In-process pub/sub bus for real-time fan-out.
//!
//! Topic-keyed broadcast channels. Each subscriber owns a bounded receive
//! buffer; a subscriber that falls behind loses the oldest messages it has not
//! read yet and nobody else notices. Delivery is at-most-once with no replay.
//!
//! Messages are `{"type": ..., "payload": ...}` JSON objects:
//!
//!   bus.publish("queue_updates", "entry.added", payload).await;
//!   let mut sub = bus.subscribe("queue_updates").await;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tokio::sync::{broadcast, RwLock};

pub use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Default per-subscriber buffer (messages).
pub const DEFAULT_CAPACITY: usize = 256;

/// Handle for one topic membership. Dropping it leaves the topic.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    topic: String,
    receiver: broadcast::Receiver<JsonValue>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next message. `Err(Lagged(n))` means `n` messages were
    /// dropped for this subscriber; the next call resumes with newer ones.
    pub async fn recv(&mut self) -> Result<JsonValue, RecvError> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<JsonValue, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Thread-safe, cloneable topic bus.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<JsonValue>>>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    /// Publish an event to every current subscriber of `topic`.
    ///
    /// Never waits on subscribers. No-op when nobody is listening.
    pub async fn publish(&self, topic: &str, event_type: &str, payload: JsonValue) {
        let message = serde_json::json!({ "type": event_type, "payload": payload });
        let channels = self.channels.read().await;
        match channels.get(topic).map(|tx| tx.send(message)) {
            Some(Ok(delivered)) => {
                tracing::debug!(topic, event_type, delivered, "Published event");
            }
            _ => tracing::trace!(topic, event_type, "No subscribers for event"),
        }
    }

    /// Join `topic`, creating its channel on first use.
    pub async fn subscribe(&self, topic: &str) -> Subscription {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        let receiver = tx.subscribe();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(topic, subscription_id = id, "Subscribed");

        Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        }
    }

    /// Leave a topic; drops the channel once its last subscriber is gone.
    pub async fn unsubscribe(&self, subscription: Subscription) {
        let Subscription { id, topic, receiver } = subscription;
        drop(receiver);

        let mut channels = self.channels.write().await;
        if channels
            .get(&topic)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            channels.remove(&topic);
        }
        tracing::debug!(topic = %topic, subscription_id = id, "Unsubscribed");
    }

    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.channels
            .read()
            .await
            .get(topic)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Remove channels with zero subscribers (housekeeping).
    pub async fn cleanup(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        before - channels.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
