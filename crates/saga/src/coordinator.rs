//! Saga coordinator for the orchestrated transaction-creation saga.

use std::sync::Arc;

use domain::Transaction;
use storage::{CategoryRepository, TransactionRepository, UserRepository};

use crate::command::CreateTransaction;
use crate::error::SagaError;
use crate::post_process::PostProcessor;
use crate::state::{SagaRun, SagaState};

/// Orchestrates the transaction-creation saga.
///
/// The coordinator drives the steps
/// `validate owner → validate category → create (atomic pair write) →
/// post-process` and compensates by deleting the aggregate when a step after
/// creation fails. The outbox envelope from the create step is never
/// retracted: consumers observe the creation and, on compensation, no
/// matching aggregate.
pub struct SagaCoordinator<S, P> {
    storage: Arc<S>,
    post_processor: P,
}

impl<S, P> SagaCoordinator<S, P>
where
    S: UserRepository + CategoryRepository + TransactionRepository,
    P: PostProcessor,
{
    /// Creates a new saga coordinator.
    pub fn new(storage: Arc<S>, post_processor: P) -> Self {
        Self {
            storage,
            post_processor,
        }
    }

    /// Executes the saga for one create command.
    ///
    /// Validation failures end the run before anything is written. A
    /// post-process failure compensates the created aggregate and surfaces
    /// the post-process error; a compensation failure on top of that is
    /// logged only.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id, category_id = %cmd.category_id))]
    pub async fn execute(&self, cmd: CreateTransaction) -> Result<Transaction, SagaError> {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();
        let mut run = SagaRun::new();

        self.storage
            .find_user(cmd.user_id)
            .await?
            .ok_or(SagaError::OwnerNotFound(cmd.user_id))?;
        run.advance(SagaState::OwnerValidated);

        self.storage
            .find_category(cmd.category_id)
            .await?
            .ok_or(SagaError::CategoryNotFound(cmd.category_id))?;
        run.advance(SagaState::CategoryValidated);

        let txn = self
            .storage
            .create_with_event(cmd.into_new_transaction())
            .await?;
        run.advance(SagaState::AggregateCreated);
        tracing::info!(transaction_id = %txn.id, "transaction and envelope persisted");

        if let Err(e) = self.post_processor.process(&txn).await {
            tracing::warn!(
                transaction_id = %txn.id,
                step = self.post_processor.name(),
                error = %e,
                "post-processing failed, compensating"
            );
            self.compensate(&mut run, &txn).await;
            metrics::counter!("saga_failed").increment(1);
            metrics::histogram!("saga_duration_seconds")
                .record(saga_start.elapsed().as_secs_f64());
            return Err(e);
        }
        run.advance(SagaState::PostProcessed);

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        metrics::counter!("saga_completed").increment(1);
        tracing::info!(transaction_id = %txn.id, duration, "saga completed");

        Ok(txn)
    }

    /// Removes the created aggregate. Best-effort: a failure here is logged
    /// and the caller still sees the error that triggered compensation.
    async fn compensate(&self, run: &mut SagaRun, txn: &Transaction) {
        run.advance(SagaState::Compensating);

        if let Err(e) = self.storage.delete(txn.id).await {
            tracing::error!(
                transaction_id = %txn.id,
                error = %e,
                "compensation failed, aggregate left in place"
            );
        } else {
            tracing::info!(transaction_id = %txn.id, "compensated: aggregate removed");
        }

        run.advance(SagaState::Compensated);
        metrics::counter!("saga_compensations_total").increment(1);
    }
}
