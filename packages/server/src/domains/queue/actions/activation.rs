//! Electing the single active entry.
//!
//! The transaction-level helpers are shared with the combined `PATCH` update
//! so that an activation and a reposition can commit together.

use std::sync::Arc;

use tracing::info;

use crate::common::EntryId;
use crate::domains::queue::error::QueueResult;
use crate::domains::queue::events::{ActivationChange, QueueEvent};
use crate::domains::queue::models::Entry;
use crate::domains::queue::store::{QueueStore, QueueTx};

pub struct ActivationManager {
    store: Arc<QueueStore>,
    history_limit: usize,
}

impl ActivationManager {
    pub fn new(store: Arc<QueueStore>, history_limit: usize) -> Self {
        Self {
            store,
            history_limit,
        }
    }

    /// Make `id` the only active entry.
    pub async fn activate(&self, id: EntryId) -> QueueResult<Entry> {
        let entry = self
            .store
            .transact("activate", move |tx| activate_within(tx, id))
            .await?;
        info!(entry_id = %id, "Entry activated");
        Ok(entry)
    }

    /// Clear every active flag. Returns the ids that were active.
    pub async fn deactivate_all(&self) -> QueueResult<Vec<EntryId>> {
        let cleared = self
            .store
            .transact("deactivate_all", |tx| Ok(deactivate_all_within(tx)))
            .await?;
        info!(count = cleared.len(), "Deactivated all entries");
        Ok(cleared)
    }

    /// Most recently activated entries, newest first, capped at the history limit.
    pub fn history(&self, limit: Option<usize>) -> Vec<Entry> {
        let limit = limit
            .unwrap_or(self.history_limit)
            .min(self.history_limit);
        self.store.recently_active(limit)
    }
}

pub(crate) fn activate_within(tx: &mut QueueTx, id: EntryId) -> QueueResult<Entry> {
    let (entry, previous_ids) = tx.set_active(id)?;
    tx.emit(QueueEvent::EntryActivated(ActivationChange {
        id: Some(id),
        entry: Some(entry.clone()),
        previous_ids,
    }));
    Ok(entry)
}

pub(crate) fn deactivate_all_within(tx: &mut QueueTx) -> Vec<EntryId> {
    let cleared = tx.clear_active(None);
    if !cleared.is_empty() {
        tx.emit(QueueEvent::EntryActivated(ActivationChange {
            id: None,
            entry: None,
            previous_ids: cleared.clone(),
        }));
    }
    cleared
}

pub(crate) fn deactivate_within(tx: &mut QueueTx, id: EntryId) -> QueueResult<Entry> {
    if tx.clear_active_one(id)? {
        tx.emit(QueueEvent::EntryActivated(ActivationChange {
            id: None,
            entry: None,
            previous_ids: vec![id],
        }));
    }
    Ok(tx.get(id)?.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::CatalogItemId;
    use crate::domains::queue::error::QueueError;
    use crate::domains::queue::events::{BusNotifier, QUEUE_TOPIC};
    use crate::kernel::event_bus::Subscription;
    use crate::kernel::EventBus;

    struct Fixture {
        store: Arc<QueueStore>,
        activation: ActivationManager,
        sub: Subscription,
    }

    async fn fixture() -> Fixture {
        let bus = EventBus::new();
        let sub = bus.subscribe(QUEUE_TOPIC).await;
        let store = Arc::new(QueueStore::new(Arc::new(BusNotifier::new(bus, QUEUE_TOPIC))));
        let activation = ActivationManager::new(store.clone(), 20);
        Fixture {
            store,
            activation,
            sub,
        }
    }

    async fn add(store: &QueueStore) -> Entry {
        store
            .insert(CatalogItemId::new(), "dj".into(), None)
            .await
            .unwrap()
    }

    fn active_ids(store: &QueueStore) -> Vec<EntryId> {
        store
            .list()
            .into_iter()
            .filter(|e| e.is_active)
            .map(|e| e.id)
            .collect()
    }

    #[tokio::test]
    async fn second_activation_fully_wins() {
        let mut f = fixture().await;
        let a = add(&f.store).await;
        let b = add(&f.store).await;
        while f.sub.try_recv().is_ok() {}

        let activated_a = f.activation.activate(a.id).await.unwrap();
        f.activation.activate(b.id).await.unwrap();

        assert_eq!(active_ids(&f.store), vec![b.id]);
        let a_now = f.store.get(a.id).unwrap();
        assert_eq!(a_now.activated_at, activated_a.activated_at);

        let first = f.sub.try_recv().unwrap();
        let second = f.sub.try_recv().unwrap();
        assert!(f.sub.try_recv().is_err());

        assert_eq!(first["type"], "entry.activated");
        assert_eq!(first["payload"]["id"], a.id.to_string());
        assert_eq!(first["payload"]["previous_ids"], serde_json::json!([]));
        assert_eq!(second["type"], "entry.activated");
        assert_eq!(second["payload"]["id"], b.id.to_string());
        assert_eq!(
            second["payload"]["previous_ids"],
            serde_json::json!([a.id.to_string()])
        );
    }

    #[tokio::test]
    async fn reactivating_keeps_original_timestamp() {
        let f = fixture().await;
        let a = add(&f.store).await;

        let first = f.activation.activate(a.id).await.unwrap();
        let again = f.activation.activate(a.id).await.unwrap();

        assert!(again.is_active);
        assert_eq!(again.activated_at, first.activated_at);
    }

    #[tokio::test]
    async fn at_most_one_active_under_concurrency() {
        let f = fixture().await;
        let mut ids = Vec::new();
        for _ in 0..8 {
            ids.push(add(&f.store).await.id);
        }
        let activation = Arc::new(f.activation);

        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let activation = activation.clone();
                let id = *id;
                tokio::spawn(async move { activation.activate(id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(active_ids(&f.store).len(), 1);
    }

    #[tokio::test]
    async fn deactivate_all_reports_cleared_ids() {
        let mut f = fixture().await;
        let a = add(&f.store).await;
        f.activation.activate(a.id).await.unwrap();
        while f.sub.try_recv().is_ok() {}

        assert_eq!(f.activation.deactivate_all().await.unwrap(), vec![a.id]);
        assert!(active_ids(&f.store).is_empty());

        let event = f.sub.try_recv().unwrap();
        assert_eq!(event["type"], "entry.activated");
        assert!(event["payload"]["id"].is_null());

        // Nothing active: no event.
        assert!(f.activation.deactivate_all().await.unwrap().is_empty());
        assert!(f.sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn activating_missing_entry_changes_nothing() {
        let f = fixture().await;
        let a = add(&f.store).await;
        f.activation.activate(a.id).await.unwrap();

        let err = f.activation.activate(EntryId::new()).await.unwrap_err();

        assert!(matches!(err, QueueError::NotFound(_)));
        assert_eq!(active_ids(&f.store), vec![a.id]);
    }

    #[tokio::test]
    async fn history_is_newest_first_and_capped() {
        let f = fixture().await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            let entry = add(&f.store).await;
            f.activation.activate(entry.id).await.unwrap();
            ids.push(entry.id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        add(&f.store).await;

        let history: Vec<EntryId> = f.activation.history(None).iter().map(|e| e.id).collect();
        assert_eq!(history, vec![ids[2], ids[1], ids[0]]);

        assert_eq!(f.activation.history(Some(1)).len(), 1);
        assert_eq!(f.activation.history(Some(500)).len(), 3);
    }
}
