pub mod actions;
pub mod error;
pub mod events;
pub mod models;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use actions::{ActivationManager, VoteAggregator, VoteOrderMode};
pub use error::{QueueError, QueueResult};
pub use events::{BusNotifier, QueueEvent, QueueNotifier, QUEUE_TOPIC};
pub use models::{Entry, EntryPatch, Placement, VoteDirection};
pub use service::{ListOrder, NewEntry, QueueService};
pub use store::{QueueSnapshot, QueueStore};
