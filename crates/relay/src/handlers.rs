//! Built-in event handlers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::CategoryId;
use domain::{Money, TransactionEvent, TransactionKind};

use crate::error::HandlerError;
use crate::publisher::EventHandler;

/// Logs every transaction lifecycle event at info level.
#[derive(Clone, Default)]
pub struct TransactionLogger {
    handled: Arc<RwLock<usize>>,
}

impl TransactionLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events this logger has handled, replays included.
    pub fn handled_count(&self) -> usize {
        *self.handled.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EventHandler for TransactionLogger {
    fn name(&self) -> &'static str {
        "transaction_logger"
    }

    async fn handle(&self, event: &TransactionEvent) -> Result<(), HandlerError> {
        match event {
            TransactionEvent::Created(data) => {
                tracing::info!(
                    transaction_id = %data.transaction_id,
                    amount = %data.amount,
                    kind = data.kind.as_str(),
                    category_id = %data.category_id,
                    "transaction created"
                );
            }
            TransactionEvent::Updated(data) => {
                tracing::info!(
                    transaction_id = %data.transaction_id,
                    amount = %data.amount,
                    old_kind = data.old_kind.as_str(),
                    new_kind = data.new_kind.as_str(),
                    "transaction updated"
                );
            }
            TransactionEvent::Deleted(data) => {
                tracing::info!(
                    transaction_id = %data.transaction_id,
                    kind = data.kind.as_str(),
                    category_id = %data.category_id,
                    "transaction deleted"
                );
            }
        }
        *self.handled.write().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

/// Tracks spending per category from the expense stream.
///
/// Only `TransactionCreated` events for expenses are counted; running totals
/// are approximate under replays since delivery is at-least-once.
#[derive(Clone, Default)]
pub struct SpendingPatternAnalyzer {
    totals: Arc<RwLock<HashMap<CategoryId, i64>>>,
}

impl SpendingPatternAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running expense total observed for a category.
    pub fn total_for(&self, category_id: CategoryId) -> Money {
        let totals = self.totals.read().unwrap_or_else(|e| e.into_inner());
        Money::from_cents(totals.get(&category_id).copied().unwrap_or(0))
    }
}

#[async_trait]
impl EventHandler for SpendingPatternAnalyzer {
    fn name(&self) -> &'static str {
        "spending_pattern_analyzer"
    }

    fn interested_in(&self, event: &TransactionEvent) -> bool {
        matches!(event, TransactionEvent::Created(data) if data.kind == TransactionKind::Expense)
    }

    async fn handle(&self, event: &TransactionEvent) -> Result<(), HandlerError> {
        if let TransactionEvent::Created(data) = event {
            let mut totals = self.totals.write().unwrap_or_else(|e| e.into_inner());
            let total = totals.entry(data.category_id).or_insert(0);
            *total += data.amount.as_cents();
            tracing::info!(
                transaction_id = %data.transaction_id,
                category_id = %data.category_id,
                amount = %data.amount,
                category_total = *total,
                "expense recorded in spending pattern"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{TransactionId, UserId};
    use domain::{NewTransaction, Transaction};

    fn txn(kind: TransactionKind, cents: i64) -> Transaction {
        NewTransaction::new(
            UserId::new(1),
            CategoryId::new(7),
            Money::from_cents(cents),
            kind,
            "sample",
        )
        .with_id(TransactionId::new(1))
    }

    #[tokio::test]
    async fn logger_handles_every_variant() {
        let logger = TransactionLogger::new();
        let created = txn(TransactionKind::Expense, 100);

        logger
            .handle(&TransactionEvent::created(&created))
            .await
            .unwrap();
        logger
            .handle(&TransactionEvent::updated(&created, TransactionKind::Income))
            .await
            .unwrap();
        logger
            .handle(&TransactionEvent::deleted(&created))
            .await
            .unwrap();

        assert_eq!(logger.handled_count(), 3);
    }

    #[tokio::test]
    async fn analyzer_accumulates_expense_totals() {
        let analyzer = SpendingPatternAnalyzer::new();

        analyzer
            .handle(&TransactionEvent::created(&txn(TransactionKind::Expense, 250)))
            .await
            .unwrap();
        analyzer
            .handle(&TransactionEvent::created(&txn(TransactionKind::Expense, 750)))
            .await
            .unwrap();

        assert_eq!(analyzer.total_for(CategoryId::new(7)).as_cents(), 1000);
        assert_eq!(analyzer.total_for(CategoryId::new(8)).as_cents(), 0);
    }

    #[tokio::test]
    async fn analyzer_ignores_income_and_deletions() {
        let analyzer = SpendingPatternAnalyzer::new();
        let income = txn(TransactionKind::Income, 500);
        let expense = txn(TransactionKind::Expense, 500);

        assert!(!analyzer.interested_in(&TransactionEvent::created(&income)));
        assert!(!analyzer.interested_in(&TransactionEvent::deleted(&expense)));
        assert!(analyzer.interested_in(&TransactionEvent::created(&expense)));
    }
}
