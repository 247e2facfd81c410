//! End-to-end tests driving the saga together with the outbox relay.

use std::sync::Arc;

use common::{CategoryId, UserId};
use domain::{Category, Money, TransactionKind, User};
use relay::{OutboxRelay, Publisher, RelayConfig, SpendingPatternAnalyzer, TransactionLogger};
use saga::{CreateTransaction, SagaCoordinator, SagaError, SpendingAnalyzer, TransactionService};
use storage::InMemoryStorage;

struct TestHarness {
    coordinator: SagaCoordinator<InMemoryStorage, SpendingAnalyzer>,
    service: TransactionService<InMemoryStorage, SpendingAnalyzer>,
    storage: Arc<InMemoryStorage>,
    analyzer: SpendingAnalyzer,
    relay: OutboxRelay<InMemoryStorage>,
    logger: TransactionLogger,
    pattern: SpendingPatternAnalyzer,
}

impl TestHarness {
    async fn new() -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .insert_user(User {
                id: UserId::new(1),
                name: "demo".to_string(),
            })
            .await;
        storage
            .insert_category(Category {
                id: CategoryId::new(1),
                name: "groceries".to_string(),
            })
            .await;

        let analyzer = SpendingAnalyzer::new();
        let coordinator = SagaCoordinator::new(storage.clone(), analyzer.clone());
        let service = TransactionService::new(storage.clone(), analyzer.clone());

        let logger = TransactionLogger::new();
        let pattern = SpendingPatternAnalyzer::new();
        let mut publisher = Publisher::new();
        publisher.register(Arc::new(logger.clone()));
        publisher.register(Arc::new(pattern.clone()));
        let relay = OutboxRelay::new(storage.clone(), publisher, RelayConfig::default());

        Self {
            coordinator,
            service,
            storage,
            analyzer,
            relay,
            logger,
            pattern,
        }
    }

    fn expense(user: i64, category: i64) -> CreateTransaction {
        CreateTransaction::new(
            UserId::new(user),
            CategoryId::new(category),
            Money::from_major(100),
            TransactionKind::Expense,
            "weekly shop",
        )
    }
}

#[tokio::test]
async fn orchestrated_create_is_delivered_by_the_relay() {
    let h = TestHarness::new().await;

    let txn = h.coordinator.execute(TestHarness::expense(1, 1)).await.unwrap();

    // Persisted pair, nothing delivered yet.
    let records = h.storage.outbox_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].envelope.event_type, "TransactionCreated");
    assert!(!records[0].delivered);

    assert_eq!(h.relay.tick().await, 1);

    let records = h.storage.outbox_records().await;
    assert!(records[0].delivered);
    assert!(records[0].delivered_at.is_some());
    assert_eq!(h.logger.handled_count(), 1);
    assert_eq!(
        h.pattern.total_for(txn.category_id).as_cents(),
        txn.amount.as_cents()
    );
}

#[tokio::test]
async fn unknown_owner_leaves_no_trace() {
    let h = TestHarness::new().await;

    let result = h.coordinator.execute(TestHarness::expense(999, 1)).await;

    assert!(matches!(result, Err(SagaError::OwnerNotFound(id)) if id == UserId::new(999)));
    assert_eq!(h.storage.transaction_count().await, 0);
    assert_eq!(h.storage.outbox_count().await, 0);
    assert_eq!(h.relay.tick().await, 0);
}

#[tokio::test]
async fn compensated_saga_still_delivers_the_creation_event() {
    let h = TestHarness::new().await;
    h.analyzer.set_fail_on_process(true);

    let result = h.coordinator.execute(TestHarness::expense(1, 1)).await;

    assert!(matches!(result, Err(SagaError::PostProcess(_))));
    assert_eq!(h.storage.transaction_count().await, 0);

    // The envelope outlives the compensated aggregate and is delivered
    // anyway; consumers see a creation with no surviving transaction.
    assert_eq!(h.relay.tick().await, 1);
    assert_eq!(h.logger.handled_count(), 1);
    assert!(h.storage.outbox_records().await[0].delivered);
}

#[tokio::test]
async fn choreography_and_orchestration_produce_the_same_effects() {
    let orchestrated = TestHarness::new().await;
    let choreographed = TestHarness::new().await;

    orchestrated
        .coordinator
        .execute(TestHarness::expense(1, 1))
        .await
        .unwrap();
    choreographed
        .service
        .create_transaction_with_saga(TestHarness::expense(1, 1))
        .await
        .unwrap();

    for h in [&orchestrated, &choreographed] {
        assert_eq!(h.storage.transaction_count().await, 1);
        assert_eq!(h.storage.outbox_count().await, 1);
        assert_eq!(h.analyzer.processed_count(), 1);
        assert_eq!(h.relay.tick().await, 1);
    }
}

#[tokio::test]
async fn full_lifecycle_delivers_all_three_event_kinds() {
    let h = TestHarness::new().await;

    let txn = h.service.create_transaction(TestHarness::expense(1, 1)).await.unwrap();
    h.service
        .update_transaction(
            txn.id,
            saga::UpdateTransaction::new(
                CategoryId::new(1),
                Money::from_major(80),
                TransactionKind::Expense,
                "discounted shop",
            ),
        )
        .await
        .unwrap();
    h.service.delete_transaction(txn.id).await.unwrap();

    assert_eq!(h.relay.tick().await, 3);
    assert_eq!(h.logger.handled_count(), 3);

    let types: Vec<_> = h
        .storage
        .outbox_records()
        .await
        .iter()
        .map(|r| r.envelope.event_type.clone())
        .collect();
    assert_eq!(
        types,
        [
            "TransactionCreated",
            "TransactionUpdated",
            "TransactionDeleted"
        ]
    );
}
