//! Authoritative queue store.
//!
//! Mutations run one at a time under a queue-wide lock. Each one works on a
//! private copy of the current snapshot ([`QueueTx`]); on success the copy is
//! validated and swapped in, then its events go to the notifier while the lock
//! is still held, so event order always matches commit order. On failure the
//! copy is dropped and nothing is published.
//!
//! Reads load the current snapshot without touching the lock.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::bail;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::common::{CatalogItemId, EntryId};
use crate::domains::queue::error::{QueueError, QueueResult};
use crate::domains::queue::events::{QueueEvent, QueueNotifier};
use crate::domains::queue::models::position::{self, Position};
use crate::domains::queue::models::{Entry, OrderingError, Placement, RenormalizeOrder};

/// Immutable view of the queue at one commit.
#[derive(Debug, Default)]
pub struct QueueSnapshot {
    entries: Vec<Entry>,
    version: u64,
}

impl QueueSnapshot {
    /// Entries in canonical order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of committed transactions so far.
    pub fn version(&self) -> u64 {
        self.version
    }
}

pub struct QueueStore {
    snapshot: ArcSwap<QueueSnapshot>,
    write_lock: Mutex<()>,
    notifier: Arc<dyn QueueNotifier>,
}

impl QueueStore {
    pub fn new(notifier: Arc<dyn QueueNotifier>) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(QueueSnapshot::default()),
            write_lock: Mutex::new(()),
            notifier,
        }
    }

    // =========================================================================
    // Reads (snapshot, never block writers)
    // =========================================================================

    pub fn snapshot(&self) -> Arc<QueueSnapshot> {
        self.snapshot.load_full()
    }

    /// Entries sorted by position, ties by id.
    pub fn list(&self) -> Vec<Entry> {
        self.snapshot.load().entries.clone()
    }

    /// Entries sorted by votes (descending), then canonical order.
    pub fn list_by_votes(&self) -> Vec<Entry> {
        let mut entries = self.list();
        entries.sort_by(Entry::vote_order);
        entries
    }

    pub fn get(&self, id: EntryId) -> QueueResult<Entry> {
        self.snapshot
            .load()
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(QueueError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries that have ever been activated, newest activation first.
    pub fn recently_active(&self, limit: usize) -> Vec<Entry> {
        let mut activated: Vec<Entry> = self
            .snapshot
            .load()
            .entries
            .iter()
            .filter(|e| e.activated_at.is_some())
            .cloned()
            .collect();
        activated.sort_by(|a, b| {
            b.activated_at
                .cmp(&a.activated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        activated.truncate(limit);
        activated
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert at an explicit position, or append after the last entry.
    pub async fn insert(
        &self,
        item_ref: CatalogItemId,
        added_by: String,
        explicit_position: Option<Position>,
    ) -> QueueResult<Entry> {
        let placement = explicit_position.map_or(Placement::End, Placement::At);
        self.insert_at(item_ref, added_by, placement).await
    }

    /// Insert next to neighbor entries; the store allocates the position.
    pub async fn insert_between(
        &self,
        item_ref: CatalogItemId,
        added_by: String,
        after: Option<EntryId>,
        before: Option<EntryId>,
    ) -> QueueResult<Entry> {
        self.insert_at(item_ref, added_by, Placement::Between { after, before })
            .await
    }

    pub async fn insert_at(
        &self,
        item_ref: CatalogItemId,
        added_by: String,
        placement: Placement,
    ) -> QueueResult<Entry> {
        self.transact("insert", move |tx| tx.insert(item_ref, added_by, placement))
            .await
    }

    /// Persist a caller-computed position.
    pub async fn reposition(&self, id: EntryId, position: Position) -> QueueResult<Entry> {
        self.transact("reposition", move |tx| tx.set_position(id, position))
            .await
    }

    /// Move an entry next to neighbor entries (drag and drop).
    pub async fn move_between(
        &self,
        id: EntryId,
        after: Option<EntryId>,
        before: Option<EntryId>,
    ) -> QueueResult<Entry> {
        self.transact("move", move |tx| tx.move_between(id, after, before))
            .await
    }

    pub async fn remove(&self, id: EntryId) -> QueueResult<()> {
        self.transact("remove", move |tx| tx.remove(id).map(|_| ()))
            .await
    }

    /// Reassign dense positions `1..N` in the given order.
    pub async fn renormalize(&self, order: RenormalizeOrder) -> QueueResult<usize> {
        self.transact("renormalize", move |tx| Ok(tx.renormalize(order)))
            .await
    }

    /// Run `f` as one atomic unit of work against the queue.
    pub(crate) async fn transact<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut QueueTx) -> QueueResult<T>,
    ) -> QueueResult<T> {
        let _guard = self.write_lock.lock().await;
        let current = self.snapshot.load_full();
        let mut tx = QueueTx::begin(&current, Utc::now());

        let value = match f(&mut tx) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(operation, code = e.code(), error = %e, "Queue transaction rolled back");
                return Err(e);
            }
        };

        let (entries, events) = tx.commit().inspect_err(|e| {
            tracing::error!(operation, error = %e, "Queue invariant check failed, rolled back");
        })?;

        let version = current.version + 1;
        self.snapshot
            .store(Arc::new(QueueSnapshot { entries, version }));

        for event in &events {
            self.notifier.committed(event).await;
        }

        tracing::debug!(operation, version, events = events.len(), "Queue transaction committed");
        Ok(value)
    }
}

/// Private working copy of the queue inside one transaction.
///
/// `entries` stays sorted in canonical order after every method.
pub(crate) struct QueueTx {
    entries: Vec<Entry>,
    events: Vec<QueueEvent>,
    now: DateTime<Utc>,
}

impl QueueTx {
    fn begin(snapshot: &QueueSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            entries: snapshot.entries.clone(),
            events: Vec::new(),
            now,
        }
    }

    pub(crate) fn get(&self, id: EntryId) -> QueueResult<&Entry> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or(QueueError::NotFound(id))
    }

    fn index_of(&self, id: EntryId) -> QueueResult<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(QueueError::NotFound(id))
    }

    pub(crate) fn emit(&mut self, event: QueueEvent) {
        self.events.push(event);
    }

    pub(crate) fn insert(
        &mut self,
        item_ref: CatalogItemId,
        added_by: String,
        placement: Placement,
    ) -> QueueResult<Entry> {
        if self.entries.iter().any(|e| e.item_ref == item_ref) {
            return Err(QueueError::DuplicateItem(item_ref));
        }

        let position = match placement {
            Placement::End => self.allocate_between(None, None, None)?,
            Placement::At(position) => position::validate(position)?,
            Placement::Between { after, before } => self.allocate_between(None, after, before)?,
        };
        self.ensure_free(position, None)?;

        let entry = Entry::new(item_ref, added_by, position, self.now);
        self.entries.push(entry.clone());
        self.sort();
        self.emit(QueueEvent::EntryAdded(entry.clone()));
        Ok(entry)
    }

    pub(crate) fn set_position(&mut self, id: EntryId, position: Position) -> QueueResult<Entry> {
        let index = self.index_of(id)?;
        let position = position::validate(position)?;
        self.ensure_free(position, Some(id))?;

        self.entries[index].position = position;
        let entry = self.entries[index].clone();
        self.sort();
        self.emit(QueueEvent::EntryMoved(entry.clone()));
        Ok(entry)
    }

    pub(crate) fn move_between(
        &mut self,
        id: EntryId,
        after: Option<EntryId>,
        before: Option<EntryId>,
    ) -> QueueResult<Entry> {
        self.index_of(id)?;
        if after.is_none() && before.is_none() {
            return Err(QueueError::validation(
                "MISSING_NEIGHBOR",
                "after or before is required",
            ));
        }
        if after == Some(id) || before == Some(id) {
            return Err(QueueError::validation(
                "INVALID_NEIGHBOR",
                "an entry cannot be its own neighbor",
            ));
        }

        let position = self.allocate_between(Some(id), after, before)?;
        self.set_position(id, position)
    }

    pub(crate) fn remove(&mut self, id: EntryId) -> QueueResult<Entry> {
        let index = self.index_of(id)?;
        let entry = self.entries.remove(index);
        self.emit(QueueEvent::EntryRemoved { id });
        Ok(entry)
    }

    pub(crate) fn adjust_votes(&mut self, id: EntryId, delta: i64) -> QueueResult<Entry> {
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];
        entry.votes = entry
            .votes
            .checked_add(delta)
            .ok_or_else(|| anyhow::anyhow!("vote counter overflow on entry {}", id))?;
        Ok(entry.clone())
    }

    /// Make `id` the only active entry. Returns it and the ids it replaced.
    pub(crate) fn set_active(&mut self, id: EntryId) -> QueueResult<(Entry, Vec<EntryId>)> {
        let index = self.index_of(id)?;
        let previous = self.clear_active(Some(id));

        let now = self.now;
        let entry = &mut self.entries[index];
        if !entry.is_active {
            entry.is_active = true;
            entry.activated_at = Some(now);
        }
        Ok((entry.clone(), previous))
    }

    /// Clear `is_active` everywhere except `keep`. Returns the cleared ids.
    pub(crate) fn clear_active(&mut self, keep: Option<EntryId>) -> Vec<EntryId> {
        self.entries
            .iter_mut()
            .filter(|e| e.is_active && Some(e.id) != keep)
            .map(|e| {
                e.is_active = false;
                e.id
            })
            .collect()
    }

    /// Clear `is_active` on one entry. Returns whether it was active.
    pub(crate) fn clear_active_one(&mut self, id: EntryId) -> QueueResult<bool> {
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];
        let was_active = entry.is_active;
        entry.is_active = false;
        Ok(was_active)
    }

    /// Assign positions `1..N` in `order`. Returns how many entries moved.
    pub(crate) fn renormalize(&mut self, order: RenormalizeOrder) -> usize {
        match order {
            RenormalizeOrder::Position => self.entries.sort_by(Entry::queue_order),
            RenormalizeOrder::Votes => self.entries.sort_by(Entry::vote_order),
        }

        let mut moved = 0;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let position = (index + 1) as Position;
            if entry.position != position {
                entry.position = position;
                moved += 1;
                self.events.push(QueueEvent::EntryMoved(entry.clone()));
            }
        }

        tracing::info!(?order, moved, "Queue renormalized");
        moved
    }

    fn allocate_between(
        &mut self,
        moving: Option<EntryId>,
        after: Option<EntryId>,
        before: Option<EntryId>,
    ) -> QueueResult<Position> {
        let (mut prev, mut next) = self.bounds(moving, after, before)?;

        if position::needs_rebalance(prev, next) {
            tracing::info!(?prev, ?next, "Position gap exhausted, rebalancing before insert");
            self.renormalize(RenormalizeOrder::Position);
            (prev, next) = self.bounds(moving, after, before)?;
        }

        Ok(position::allocate(prev, next)?)
    }

    /// Neighbor positions around the requested slot, ignoring `moving`.
    fn bounds(
        &self,
        moving: Option<EntryId>,
        after: Option<EntryId>,
        before: Option<EntryId>,
    ) -> QueueResult<(Option<Position>, Option<Position>)> {
        let order: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| Some(e.id) != moving)
            .collect();

        let index_of = |id: EntryId| {
            order.iter().position(|e| e.id == id).ok_or_else(|| {
                QueueError::validation(
                    "UNKNOWN_NEIGHBOR",
                    format!("neighbor entry {} is not in the queue", id),
                )
            })
        };

        let bounds = match (after, before) {
            (Some(after), Some(before)) => {
                let (prev, next) = (index_of(after)?, index_of(before)?);
                // Inverted pairs are left to the allocator to name.
                if prev < next && next != prev + 1 {
                    return Err(QueueError::validation(
                        "NON_ADJACENT_NEIGHBORS",
                        format!("entry {} does not directly follow entry {}", before, after),
                    ));
                }
                (Some(order[prev].position), Some(order[next].position))
            }
            (Some(after), None) => {
                let index = index_of(after)?;
                (
                    Some(order[index].position),
                    order.get(index + 1).map(|e| e.position),
                )
            }
            (None, Some(before)) => {
                let index = index_of(before)?;
                (
                    index.checked_sub(1).map(|i| order[i].position),
                    Some(order[index].position),
                )
            }
            (None, None) => (order.last().map(|e| e.position), None),
        };
        Ok(bounds)
    }

    fn ensure_free(&self, position: Position, except: Option<EntryId>) -> QueueResult<()> {
        match self
            .entries
            .iter()
            .find(|e| Some(e.id) != except && e.position == position)
        {
            Some(occupant) => Err(OrderingError::Occupied {
                position,
                occupant: occupant.id,
            }
            .into()),
            None => Ok(()),
        }
    }

    fn sort(&mut self) {
        self.entries.sort_by(Entry::queue_order);
    }

    fn commit(mut self) -> QueueResult<(Vec<Entry>, Vec<QueueEvent>)> {
        self.sort();
        check_invariants(&self.entries)?;
        Ok((self.entries, self.events))
    }
}

fn check_invariants(entries: &[Entry]) -> anyhow::Result<()> {
    let mut items = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !items.insert(entry.item_ref) {
            bail!("item {} appears twice in the queue", entry.item_ref);
        }
        if !entry.position.is_finite() || entry.position < 0.0 {
            bail!("entry {} has invalid position {}", entry.id, entry.position);
        }
    }

    let active = entries.iter().filter(|e| e.is_active).count();
    if active > 1 {
        bail!("{} entries are active at once", active);
    }

    if let Some(pair) = entries
        .windows(2)
        .find(|pair| pair[0].position >= pair[1].position)
    {
        bail!(
            "entries {} and {} share position {}",
            pair[0].id,
            pair[1].id,
            pair[1].position
        );
    }
    Ok(())
}
