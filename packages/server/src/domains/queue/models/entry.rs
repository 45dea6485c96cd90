use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Position;
use crate::common::{CatalogItemId, EntryId};

/// Default `added_by` when the client leaves it blank.
pub const ANONYMOUS: &str = "Anonymous";

/// Maximum accepted length of `added_by`.
pub const ADDED_BY_MAX_LEN: usize = 100;

/// One item's record within the ordered queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub item_ref: CatalogItemId,
    pub position: Position,
    pub votes: i64,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
    pub is_active: bool,
    pub activated_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub(crate) fn new(
        item_ref: CatalogItemId,
        added_by: String,
        position: Position,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            item_ref,
            position,
            votes: 0,
            added_by,
            added_at: now,
            is_active: false,
            activated_at: None,
        }
    }

    /// Canonical queue order: position ascending, ties by id.
    pub fn queue_order(a: &Entry, b: &Entry) -> Ordering {
        a.position
            .total_cmp(&b.position)
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Vote order: votes descending, then canonical order.
    pub fn vote_order(a: &Entry, b: &Entry) -> Ordering {
        b.votes.cmp(&a.votes).then_with(|| Entry::queue_order(a, b))
    }
}

/// Direction of a single vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn delta(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

impl std::fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteDirection::Up => write!(f, "up"),
            VoteDirection::Down => write!(f, "down"),
        }
    }
}

/// Where a new entry goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// After the current last entry.
    End,
    /// A caller-computed position.
    At(Position),
    /// Next to neighbor entries; the store allocates the position.
    Between {
        after: Option<EntryId>,
        before: Option<EntryId>,
    },
}

/// Sort key used by a renormalization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenormalizeOrder {
    Position,
    Votes,
}

/// Partial update applied by `PATCH /api/queue/:id`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntryPatch {
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.is_active.is_none()
    }
}

/// Normalize the free-form `added_by` field.
pub fn normalize_added_by(raw: Option<&str>) -> Option<String> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Some(ANONYMOUS.to_string());
    }
    if trimmed.chars().count() > ADDED_BY_MAX_LEN {
        return None;
    }
    Some(trimmed.to_string())
}
