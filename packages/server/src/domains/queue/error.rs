use std::time::Duration;

use thiserror::Error;

use crate::common::{CatalogItemId, EntryId};
use crate::domains::queue::models::OrderingError;

/// Every way a queue operation can fail.
///
/// Each variant has a stable machine-readable [`code`](QueueError::code).
/// Any error aborts the enclosing transaction and nothing is published.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    #[error("Item {0} is already in the queue")]
    DuplicateItem(CatalogItemId),

    #[error("Queue entry {0} not found")]
    NotFound(EntryId),

    #[error("Invalid ordering: {0}")]
    InvalidOrdering(#[from] OrderingError),

    #[error("Rate limit exceeded. Max {max_calls} calls per {}s", .window.as_secs())]
    RateLimitExceeded { max_calls: usize, window: Duration },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl QueueError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        QueueError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            QueueError::Validation { code, .. } => code,
            QueueError::DuplicateItem(_) => "DUPLICATE_ITEM",
            QueueError::NotFound(_) => "NOT_FOUND",
            QueueError::InvalidOrdering(_) => "INVALID_ORDERING",
            QueueError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            QueueError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type QueueResult<T> = std::result::Result<T, QueueError>;
