//! Request pipeline for the queue.
//!
//! Every operation runs its stages in a fixed order: admission (rate limit),
//! then validation and catalog lookup, then the store mutation. Publication
//! happens on the store's commit path, so a rejected request never emits.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, info};

use crate::common::{CatalogItemId, EntryId};
use crate::config::QueueSettings;
use crate::domains::queue::actions::activation;
use crate::domains::queue::actions::{ActivationManager, VoteAggregator, VoteOrderMode};
use crate::domains::queue::error::{QueueError, QueueResult};
use crate::domains::queue::models::{
    normalize_added_by, Entry, EntryPatch, Placement, Position, VoteDirection,
};
use crate::domains::queue::store::QueueStore;
use crate::kernel::{BaseCatalog, RateLimiter};

/// Body of `POST /api/queue`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEntry {
    #[serde(default)]
    pub item_ref: Option<String>,
    #[serde(default)]
    pub added_by: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub after: Option<EntryId>,
    #[serde(default)]
    pub before: Option<EntryId>,
}

/// Requested listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    Position,
    Votes,
}

pub struct QueueService {
    store: Arc<QueueStore>,
    votes: VoteAggregator,
    activation: ActivationManager,
    catalog: Arc<dyn BaseCatalog>,
    limiter: Arc<RateLimiter>,
}

impl QueueService {
    pub fn new(
        store: Arc<QueueStore>,
        catalog: Arc<dyn BaseCatalog>,
        limiter: Arc<RateLimiter>,
        settings: &QueueSettings,
    ) -> Self {
        Self {
            votes: VoteAggregator::new(store.clone(), settings.vote_order),
            activation: ActivationManager::new(store.clone(), settings.history_limit),
            store,
            catalog,
            limiter,
        }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<dyn BaseCatalog> {
        &self.catalog
    }

    pub fn vote_order(&self) -> VoteOrderMode {
        self.votes.mode()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current queue. Without an explicit order, vote order is used when the
    /// vote mode enables it.
    pub fn list(&self, order: Option<ListOrder>) -> Vec<Entry> {
        let order = order.unwrap_or(if self.votes.mode().lists_by_votes() {
            ListOrder::Votes
        } else {
            ListOrder::Position
        });
        match order {
            ListOrder::Position => self.store.list(),
            ListOrder::Votes => self.store.list_by_votes(),
        }
    }

    pub fn get(&self, id: EntryId) -> QueueResult<Entry> {
        self.store.get(id)
    }

    pub fn history(&self, limit: Option<usize>) -> Vec<Entry> {
        self.activation.history(limit)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn add_entry(&self, request: NewEntry) -> QueueResult<Entry> {
        let raw_ref = request
            .item_ref
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| QueueError::validation("MISSING_ITEM_REF", "item_ref is required"))?;

        let unknown = || {
            QueueError::validation(
                "UNKNOWN_ITEM_REF",
                format!("catalog item {} does not exist", raw_ref),
            )
        };
        let item_ref: CatalogItemId = raw_ref.parse().map_err(|_| unknown())?;
        let item = self.catalog.find(item_ref).await?.ok_or_else(unknown)?;

        let added_by = normalize_added_by(request.added_by.as_deref()).ok_or_else(|| {
            QueueError::validation(
                "ADDED_BY_TOO_LONG",
                "added_by must be at most 100 characters",
            )
        })?;

        let placement = match (request.position, request.after, request.before) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(QueueError::validation(
                    "CONFLICTING_PLACEMENT",
                    "position cannot be combined with after or before",
                ))
            }
            (Some(position), None, None) => Placement::At(position),
            (None, None, None) => Placement::End,
            (None, after, before) => Placement::Between { after, before },
        };

        let entry = self.store.insert_at(item_ref, added_by, placement).await?;
        info!(
            entry_id = %entry.id,
            item = %item,
            position = entry.position,
            added_by = %entry.added_by,
            "Entry added"
        );
        Ok(entry)
    }

    /// Apply a partial update in one transaction. Activation goes first so a
    /// failed reposition also undoes it.
    pub async fn update_entry(&self, id: EntryId, patch: EntryPatch) -> QueueResult<Entry> {
        if patch.is_empty() {
            return self.store.get(id);
        }

        let EntryPatch {
            position,
            is_active,
        } = patch;

        let entry = self
            .store
            .transact("update", move |tx| {
                match is_active {
                    Some(true) => {
                        activation::activate_within(tx, id)?;
                    }
                    Some(false) => {
                        activation::deactivate_within(tx, id)?;
                    }
                    None => {}
                }
                if let Some(position) = position {
                    tx.set_position(id, position)?;
                }
                Ok(tx.get(id)?.clone())
            })
            .await?;

        info!(entry_id = %id, ?position, ?is_active, "Entry updated");
        Ok(entry)
    }

    pub async fn remove_entry(&self, id: EntryId) -> QueueResult<()> {
        self.store.remove(id).await?;
        info!(entry_id = %id, "Entry removed");
        Ok(())
    }

    pub async fn move_entry(
        &self,
        id: EntryId,
        after: Option<EntryId>,
        before: Option<EntryId>,
    ) -> QueueResult<Entry> {
        let entry = self.store.move_between(id, after, before).await?;
        info!(entry_id = %id, position = entry.position, "Entry moved");
        Ok(entry)
    }

    /// Rate-limited vote. `identity` is the caller's client address.
    pub async fn vote(
        &self,
        identity: &str,
        id: EntryId,
        direction: VoteDirection,
    ) -> QueueResult<Entry> {
        if !self.limiter.admit(identity, Instant::now()) {
            debug!(identity, entry_id = %id, "Vote rejected by rate limiter");
            return Err(QueueError::RateLimitExceeded {
                max_calls: self.limiter.max_calls(),
                window: self.limiter.window(),
            });
        }
        self.votes.apply_vote(id, direction).await
    }

    pub async fn activate(&self, id: EntryId) -> QueueResult<Entry> {
        self.activation.activate(id).await
    }

    pub async fn deactivate_all(&self) -> QueueResult<Vec<EntryId>> {
        self.activation.deactivate_all().await
    }
}
