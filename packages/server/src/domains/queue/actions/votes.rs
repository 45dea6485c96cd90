//! Voting on queue entries.

use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::common::EntryId;
use crate::domains::queue::error::QueueResult;
use crate::domains::queue::events::QueueEvent;
use crate::domains::queue::models::{Entry, RenormalizeOrder, VoteDirection};
use crate::domains::queue::store::QueueStore;

/// How votes influence queue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoteOrderMode {
    /// Votes are counted only.
    #[default]
    Off,
    /// Listing sorts by votes at read time; positions are untouched.
    ReadTime,
    /// Every vote rewrites all positions to `1..N` in vote order.
    Persisted,
}

impl VoteOrderMode {
    /// Whether listings default to vote order.
    pub fn lists_by_votes(self) -> bool {
        !matches!(self, VoteOrderMode::Off)
    }
}

impl FromStr for VoteOrderMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "" => Ok(VoteOrderMode::Off),
            "read" => Ok(VoteOrderMode::ReadTime),
            "persist" => Ok(VoteOrderMode::Persisted),
            other => Err(anyhow::anyhow!(
                "Invalid vote order mode: {} (expected off, read or persist)",
                other
            )),
        }
    }
}

pub struct VoteAggregator {
    store: Arc<QueueStore>,
    mode: VoteOrderMode,
}

impl VoteAggregator {
    pub fn new(store: Arc<QueueStore>, mode: VoteOrderMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> VoteOrderMode {
        self.mode
    }

    /// Add exactly one vote in `direction`. No floor, no ceiling.
    pub async fn apply_vote(&self, id: EntryId, direction: VoteDirection) -> QueueResult<Entry> {
        let renormalize = self.mode == VoteOrderMode::Persisted;

        let entry = self
            .store
            .transact("vote", move |tx| {
                tx.adjust_votes(id, direction.delta())?;
                if renormalize {
                    tx.renormalize(RenormalizeOrder::Votes);
                }
                let entry = tx.get(id)?.clone();
                tx.emit(QueueEvent::EntryVoted(entry.clone()));
                Ok(entry)
            })
            .await?;

        info!(entry_id = %id, %direction, votes = entry.votes, "Vote applied");
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CatalogItemId;
    use crate::domains::queue::error::QueueError;
    use crate::domains::queue::events::NoopNotifier;

    async fn store_with(count: usize) -> (Arc<QueueStore>, Vec<Entry>) {
        let store = Arc::new(QueueStore::new(Arc::new(NoopNotifier)));
        let mut entries = Vec::new();
        for _ in 0..count {
            entries.push(
                store
                    .insert(CatalogItemId::new(), "voter".into(), None)
                    .await
                    .unwrap(),
            );
        }
        (store, entries)
    }

    #[tokio::test]
    async fn votes_are_unit_steps_without_floor() {
        let (store, entries) = store_with(1).await;
        let votes = VoteAggregator::new(store.clone(), VoteOrderMode::Off);
        let id = entries[0].id;

        for _ in 0..5 {
            votes.apply_vote(id, VoteDirection::Up).await.unwrap();
        }
        for _ in 0..6 {
            votes.apply_vote(id, VoteDirection::Down).await.unwrap();
        }

        assert_eq!(store.get(id).unwrap().votes, -1);
    }

    #[tokio::test]
    async fn votes_do_not_move_entries_by_default() {
        let (store, entries) = store_with(3).await;
        let votes = VoteAggregator::new(store.clone(), VoteOrderMode::ReadTime);

        votes.apply_vote(entries[2].id, VoteDirection::Up).await.unwrap();

        let positions: Vec<f64> = store.list().iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(store.list_by_votes()[0].id, entries[2].id);
    }

    #[tokio::test]
    async fn persisted_mode_rewrites_positions_in_vote_order() {
        let (store, entries) = store_with(3).await;
        let votes = VoteAggregator::new(store.clone(), VoteOrderMode::Persisted);

        votes.apply_vote(entries[2].id, VoteDirection::Up).await.unwrap();
        let voted = votes.apply_vote(entries[0].id, VoteDirection::Down).await.unwrap();

        let listed = store.list();
        let ids: Vec<EntryId> = listed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![entries[2].id, entries[1].id, entries[0].id]);
        let positions: Vec<f64> = listed.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![1.0, 2.0, 3.0]);
        assert_eq!(voted.position, 3.0);
    }

    #[tokio::test]
    async fn voting_on_missing_entry_is_not_found() {
        let (store, _) = store_with(0).await;
        let votes = VoteAggregator::new(store, VoteOrderMode::Off);

        let err = votes
            .apply_vote(EntryId::new(), VoteDirection::Up)
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::NotFound(_)));
    }

    #[test]
    fn mode_parses_from_config_values() {
        assert_eq!("off".parse::<VoteOrderMode>().unwrap(), VoteOrderMode::Off);
        assert_eq!("READ".parse::<VoteOrderMode>().unwrap(), VoteOrderMode::ReadTime);
        assert_eq!(
            "persist".parse::<VoteOrderMode>().unwrap(),
            VoteOrderMode::Persisted
        );
        assert!("sometimes".parse::<VoteOrderMode>().is_err());
    }
}
