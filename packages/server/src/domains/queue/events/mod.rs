//! Queue events and the notification seam the store commits through.
//!
//! Events are immutable facts about committed mutations. The store hands them
//! to its [`QueueNotifier`] after a transaction commits, in commit order.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::common::EntryId;
use crate::domains::queue::models::Entry;
use crate::kernel::EventBus;

/// Topic every queue observer joins.
pub const QUEUE_TOPIC: &str = "queue_updates";

/// Payload of `entry.activated`.
///
/// `id` is `None` when the change only deactivated entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivationChange {
    pub id: Option<EntryId>,
    pub entry: Option<Entry>,
    pub previous_ids: Vec<EntryId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    EntryAdded(Entry),
    EntryRemoved { id: EntryId },
    EntryMoved(Entry),
    EntryVoted(Entry),
    EntryActivated(ActivationChange),
}

impl QueueEvent {
    /// Wire name of the event.
    pub fn event_type(&self) -> &'static str {
        match self {
            QueueEvent::EntryAdded(_) => "entry.added",
            QueueEvent::EntryRemoved { .. } => "entry.removed",
            QueueEvent::EntryMoved(_) => "entry.moved",
            QueueEvent::EntryVoted(_) => "entry.voted",
            QueueEvent::EntryActivated(_) => "entry.activated",
        }
    }

    pub fn payload(&self) -> serde_json::Result<JsonValue> {
        match self {
            QueueEvent::EntryAdded(entry)
            | QueueEvent::EntryMoved(entry)
            | QueueEvent::EntryVoted(entry) => serde_json::to_value(entry),
            QueueEvent::EntryRemoved { id } => Ok(serde_json::json!({ "id": id })),
            QueueEvent::EntryActivated(change) => serde_json::to_value(change),
        }
    }
}

/// Receives committed events from the queue store.
#[async_trait]
pub trait QueueNotifier: Send + Sync {
    async fn committed(&self, event: &QueueEvent);
}

/// Notifier that publishes every event to one [`EventBus`] topic.
#[derive(Clone)]
pub struct BusNotifier {
    bus: EventBus,
    topic: String,
}

impl BusNotifier {
    pub fn new(bus: EventBus, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl QueueNotifier for BusNotifier {
    async fn committed(&self, event: &QueueEvent) {
        match event.payload() {
            Ok(payload) => {
                self.bus
                    .publish(&self.topic, event.event_type(), payload)
                    .await;
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_type = event.event_type(),
                    "Failed to serialize queue event"
                );
            }
        }
    }
}

/// Notifier that drops everything (tools and tests that do not observe events).
pub struct NoopNotifier;

#[async_trait]
impl QueueNotifier for NoopNotifier {
    async fn committed(&self, _event: &QueueEvent) {}
}
