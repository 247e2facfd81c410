use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CategoryId, EventId, TransactionId, UserId};
use domain::{Category, NewTransaction, Transaction, TransactionEvent, User};
use tokio::sync::RwLock;

use crate::{
    CategoryRepository, OutboxEnvelope, OutboxRecord, OutboxStore, Result, StorageError,
    TransactionRepository, UserRepository,
};

#[derive(Debug, Default)]
struct StorageState {
    users: HashMap<UserId, User>,
    categories: HashMap<CategoryId, Category>,
    transactions: HashMap<TransactionId, Transaction>,
    next_transaction_id: i64,
    outbox: Vec<OutboxRecord>,
    next_sequence_id: i64,
    fail_on_write: bool,
    fail_on_delete: bool,
}

/// In-memory storage implementation.
///
/// All tables live behind a single lock, so a pair write (business row plus
/// outbox envelope) is atomic by construction. Provides the same interface
/// as the PostgreSQL implementation and is the default for tests and local
/// runs.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<RwLock<StorageState>>,
}

impl InMemoryStorage {
    /// Creates new empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user row directly. Used for seeding and tests.
    pub async fn insert_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    /// Inserts a category row directly. Used for seeding and tests.
    pub async fn insert_category(&self, category: Category) {
        self.state
            .write()
            .await
            .categories
            .insert(category.id, category);
    }

    /// Makes every subsequent pair write fail before mutating anything.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    /// Makes every subsequent compensating delete fail.
    pub async fn set_fail_on_delete(&self, fail: bool) {
        self.state.write().await.fail_on_delete = fail;
    }

    /// Returns the number of stored transactions.
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    /// Returns the total number of outbox records, delivered or not.
    pub async fn outbox_count(&self) -> usize {
        self.state.read().await.outbox.len()
    }

    /// Returns a copy of every outbox record in insertion order.
    pub async fn outbox_records(&self) -> Vec<OutboxRecord> {
        self.state.read().await.outbox.clone()
    }

    /// Appends a bare envelope with no accompanying business write. Used for
    /// seeding tests with hand-built records.
    pub async fn append_envelope(&self, envelope: OutboxEnvelope) {
        let mut state = self.state.write().await;
        Self::append_record(&mut state, envelope);
    }

    fn append_record(state: &mut StorageState, envelope: OutboxEnvelope) {
        state.next_sequence_id += 1;
        state.outbox.push(OutboxRecord {
            sequence_id: state.next_sequence_id,
            envelope,
            delivered: false,
            delivered_at: None,
        });
    }
}

#[async_trait]
impl UserRepository for InMemoryStorage {
    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStorage {
    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStorage {
    async fn create_with_event(&self, new: NewTransaction) -> Result<Transaction> {
        let mut state = self.state.write().await;

        if state.fail_on_write {
            return Err(StorageError::Unavailable("write failure injected".into()));
        }

        let txn = new.with_id(TransactionId::new(state.next_transaction_id + 1));
        let envelope = OutboxEnvelope::for_event(&TransactionEvent::created(&txn))?;

        // Envelope built; from here both writes happen under the one lock.
        state.next_transaction_id += 1;
        state.transactions.insert(txn.id, txn.clone());
        Self::append_record(&mut state, envelope);

        Ok(txn)
    }

    async fn update_with_event(
        &self,
        txn: Transaction,
        envelope: OutboxEnvelope,
    ) -> Result<Transaction> {
        let mut state = self.state.write().await;

        if state.fail_on_write {
            return Err(StorageError::Unavailable("write failure injected".into()));
        }
        if !state.transactions.contains_key(&txn.id) {
            return Err(StorageError::TransactionNotFound(txn.id));
        }

        state.transactions.insert(txn.id, txn.clone());
        Self::append_record(&mut state, envelope);

        Ok(txn)
    }

    async fn delete_with_event(&self, id: TransactionId, envelope: OutboxEnvelope) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_write {
            return Err(StorageError::Unavailable("write failure injected".into()));
        }
        if state.transactions.remove(&id).is_none() {
            return Err(StorageError::TransactionNotFound(id));
        }

        Self::append_record(&mut state, envelope);
        Ok(())
    }

    async fn delete(&self, id: TransactionId) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_on_delete {
            return Err(StorageError::Unavailable("delete failure injected".into()));
        }
        if state.transactions.remove(&id).is_none() {
            return Err(StorageError::TransactionNotFound(id));
        }
        Ok(())
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        Ok(self.state.read().await.transactions.get(&id).cloned())
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        let mut txns: Vec<_> = state.transactions.values().cloned().collect();
        txns.sort_by_key(|t| t.id);
        Ok(txns)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let state = self.state.read().await;
        let mut txns: Vec<_> = state
            .transactions
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        txns.sort_by_key(|t| t.id);
        Ok(txns)
    }
}

#[async_trait]
impl OutboxStore for InMemoryStorage {
    async fn fetch_undelivered(&self, max: usize) -> Result<Vec<OutboxRecord>> {
        let state = self.state.read().await;
        let mut pending: Vec<_> = state
            .outbox
            .iter()
            .filter(|r| !r.delivered)
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.envelope
                .created_at
                .cmp(&b.envelope.created_at)
                .then(a.sequence_id.cmp(&b.sequence_id))
        });
        pending.truncate(max);
        Ok(pending)
    }

    async fn mark_delivered(&self, event_id: EventId) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .outbox
            .iter_mut()
            .find(|r| r.envelope.event_id == event_id)
            .ok_or(StorageError::OutboxRecordNotFound(event_id))?;

        if !record.delivered {
            record.delivered = true;
            record.delivered_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domain::{Money, TransactionKind};

    fn sample_new(user: i64, description: &str) -> NewTransaction {
        NewTransaction::new(
            UserId::new(user),
            CategoryId::new(1),
            Money::from_cents(10000),
            TransactionKind::Expense,
            description,
        )
    }

    #[tokio::test]
    async fn create_persists_transaction_and_envelope_together() {
        let storage = InMemoryStorage::new();

        let txn = storage.create_with_event(sample_new(1, "rent")).await.unwrap();

        assert_eq!(txn.id, TransactionId::new(1));
        assert_eq!(storage.transaction_count().await, 1);
        assert_eq!(storage.outbox_count().await, 1);

        let records = storage.outbox_records().await;
        assert_eq!(records[0].envelope.event_type, "TransactionCreated");
        assert!(!records[0].delivered);
        assert!(records[0].delivered_at.is_none());
    }

    #[tokio::test]
    async fn injected_failure_leaves_neither_row_nor_envelope() {
        let storage = InMemoryStorage::new();
        storage.set_fail_on_write(true).await;

        let result = storage.create_with_event(sample_new(1, "rent")).await;

        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert_eq!(storage.transaction_count().await, 0);
        assert_eq!(storage.outbox_count().await, 0);
    }

    #[tokio::test]
    async fn fetch_undelivered_is_fifo_by_created_at_then_sequence() {
        let storage = InMemoryStorage::new();
        let base = Utc::now();

        // Insert out of timestamp order to exercise the sort.
        for (offset, tag) in [(2, "late"), (0, "early"), (1, "middle")] {
            storage
                .append_envelope(OutboxEnvelope::from_parts(
                    "TransactionCreated",
                    serde_json::json!({ "tag": tag }),
                    base + Duration::seconds(offset),
                ))
                .await;
        }

        let records = storage.fetch_undelivered(10).await.unwrap();
        let tags: Vec<_> = records
            .iter()
            .map(|r| r.envelope.payload["tag"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(tags, ["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn fetch_undelivered_ties_broken_by_sequence_id() {
        let storage = InMemoryStorage::new();
        let at = Utc::now();

        for tag in ["first", "second", "third"] {
            storage
                .append_envelope(OutboxEnvelope::from_parts(
                    "TransactionCreated",
                    serde_json::json!({ "tag": tag }),
                    at,
                ))
                .await;
        }

        let records = storage.fetch_undelivered(10).await.unwrap();
        let sequence_ids: Vec<_> = records.iter().map(|r| r.sequence_id).collect();
        assert_eq!(sequence_ids, [1, 2, 3]);
    }

    #[tokio::test]
    async fn fetch_undelivered_respects_batch_limit() {
        let storage = InMemoryStorage::new();
        for i in 0..5 {
            storage
                .create_with_event(sample_new(1, &format!("txn-{i}")))
                .await
                .unwrap();
        }

        let records = storage.fetch_undelivered(3).await.unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn mark_delivered_is_idempotent() {
        let storage = InMemoryStorage::new();
        storage.create_with_event(sample_new(1, "rent")).await.unwrap();

        let event_id = storage.outbox_records().await[0].envelope.event_id;

        storage.mark_delivered(event_id).await.unwrap();
        let first = storage.outbox_records().await[0].clone();
        assert!(first.delivered);
        let delivered_at = first.delivered_at.unwrap();

        // Second call is a no-op: still Ok, timestamp unchanged.
        storage.mark_delivered(event_id).await.unwrap();
        let second = storage.outbox_records().await[0].clone();
        assert_eq!(second.delivered_at, Some(delivered_at));
    }

    #[tokio::test]
    async fn mark_delivered_unknown_event_is_not_found() {
        let storage = InMemoryStorage::new();
        let result = storage.mark_delivered(EventId::new()).await;
        assert!(matches!(result, Err(StorageError::OutboxRecordNotFound(_))));
    }

    #[tokio::test]
    async fn delivered_records_are_excluded_from_fetch_but_retained() {
        let storage = InMemoryStorage::new();
        storage.create_with_event(sample_new(1, "a")).await.unwrap();
        storage.create_with_event(sample_new(1, "b")).await.unwrap();

        let first = storage.fetch_undelivered(10).await.unwrap()[0].clone();
        storage.mark_delivered(first.envelope.event_id).await.unwrap();

        let pending = storage.fetch_undelivered(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        // Append-only audit trail: nothing is deleted.
        assert_eq!(storage.outbox_count().await, 2);
    }

    #[tokio::test]
    async fn update_with_event_replaces_row_and_appends() {
        let storage = InMemoryStorage::new();
        let txn = storage.create_with_event(sample_new(1, "rent")).await.unwrap();

        let mut changed = txn.clone();
        changed.kind = TransactionKind::Income;
        let envelope = OutboxEnvelope::for_event(&TransactionEvent::updated(&changed, txn.kind))
            .unwrap();
        storage.update_with_event(changed.clone(), envelope).await.unwrap();

        let stored = storage.find_transaction(txn.id).await.unwrap().unwrap();
        assert_eq!(stored.kind, TransactionKind::Income);
        assert_eq!(storage.outbox_count().await, 2);
        assert_eq!(
            storage.outbox_records().await[1].envelope.event_type,
            "TransactionUpdated"
        );
    }

    #[tokio::test]
    async fn delete_with_event_removes_row_and_appends() {
        let storage = InMemoryStorage::new();
        let txn = storage.create_with_event(sample_new(1, "rent")).await.unwrap();

        let envelope = OutboxEnvelope::for_event(&TransactionEvent::deleted(&txn)).unwrap();
        storage.delete_with_event(txn.id, envelope).await.unwrap();

        assert_eq!(storage.transaction_count().await, 0);
        assert_eq!(storage.outbox_count().await, 2);
    }

    #[tokio::test]
    async fn plain_delete_emits_no_envelope() {
        let storage = InMemoryStorage::new();
        let txn = storage.create_with_event(sample_new(1, "rent")).await.unwrap();

        storage.delete(txn.id).await.unwrap();

        assert_eq!(storage.transaction_count().await, 0);
        // Only the creation envelope remains.
        assert_eq!(storage.outbox_count().await, 1);
    }

    #[tokio::test]
    async fn delete_missing_transaction_is_not_found() {
        let storage = InMemoryStorage::new();
        let result = storage.delete(TransactionId::new(99)).await;
        assert!(matches!(result, Err(StorageError::TransactionNotFound(_))));
    }

    #[tokio::test]
    async fn list_for_user_filters_by_owner() {
        let storage = InMemoryStorage::new();
        storage.create_with_event(sample_new(1, "a")).await.unwrap();
        storage.create_with_event(sample_new(2, "b")).await.unwrap();
        storage.create_with_event(sample_new(1, "c")).await.unwrap();

        let mine = storage.list_for_user(UserId::new(1)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|t| t.user_id == UserId::new(1)));
    }
}
