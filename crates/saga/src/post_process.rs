//! Post-processing step trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Transaction, TransactionKind};

use crate::error::SagaError;

/// The step that runs after a transaction and its envelope are persisted.
///
/// A failure here triggers compensation of the created aggregate, so
/// implementations should fail only for conditions that genuinely invalidate
/// the transaction.
#[async_trait]
pub trait PostProcessor: Send + Sync {
    /// Stable step name for logs.
    fn name(&self) -> &'static str;

    /// Processes a freshly created transaction.
    async fn process(&self, txn: &Transaction) -> Result<(), SagaError>;
}

#[derive(Debug, Default)]
struct SpendingAnalyzerState {
    processed: usize,
    expense_cents: i64,
    fail_on_process: bool,
}

/// Default post-processor: inspects spending on the new transaction.
///
/// In-memory, with a failure toggle for exercising the compensation path.
#[derive(Debug, Clone, Default)]
pub struct SpendingAnalyzer {
    state: Arc<RwLock<SpendingAnalyzerState>>,
}

impl SpendingAnalyzer {
    /// Creates a new analyzer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the analyzer to fail on the next process call.
    pub fn set_fail_on_process(&self, fail: bool) {
        self.state.write().unwrap().fail_on_process = fail;
    }

    /// Number of transactions processed so far.
    pub fn processed_count(&self) -> usize {
        self.state.read().unwrap().processed
    }

    /// Total expense cents seen across processed transactions.
    pub fn expense_cents(&self) -> i64 {
        self.state.read().unwrap().expense_cents
    }
}

#[async_trait]
impl PostProcessor for SpendingAnalyzer {
    fn name(&self) -> &'static str {
        "spending_analyzer"
    }

    async fn process(&self, txn: &Transaction) -> Result<(), SagaError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_process {
            return Err(SagaError::PostProcess(
                "spending analysis failure injected".to_string(),
            ));
        }

        state.processed += 1;
        if txn.kind == TransactionKind::Expense {
            state.expense_cents += txn.amount.as_cents();
            tracing::info!(
                transaction_id = %txn.id,
                category_id = %txn.category_id,
                amount = %txn.amount,
                "analyzed expense"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CategoryId, TransactionId, UserId};
    use domain::{Money, NewTransaction};

    fn txn(kind: TransactionKind, cents: i64) -> Transaction {
        NewTransaction::new(
            UserId::new(1),
            CategoryId::new(1),
            Money::from_cents(cents),
            kind,
            "sample",
        )
        .with_id(TransactionId::new(1))
    }

    #[tokio::test]
    async fn accumulates_expenses_only() {
        let analyzer = SpendingAnalyzer::new();

        analyzer.process(&txn(TransactionKind::Expense, 300)).await.unwrap();
        analyzer.process(&txn(TransactionKind::Income, 900)).await.unwrap();

        assert_eq!(analyzer.processed_count(), 2);
        assert_eq!(analyzer.expense_cents(), 300);
    }

    #[tokio::test]
    async fn injected_failure_is_a_post_process_error() {
        let analyzer = SpendingAnalyzer::new();
        analyzer.set_fail_on_process(true);

        let result = analyzer.process(&txn(TransactionKind::Expense, 300)).await;
        assert!(matches!(result, Err(SagaError::PostProcess(_))));
        assert_eq!(analyzer.processed_count(), 0);
    }
}
