//! Transaction service: plain creates, the choreography-style saga, and
//! update/delete pair writes.

use std::sync::Arc;

use common::{TransactionId, UserId};
use domain::{Transaction, TransactionEvent};
use storage::{
    CategoryRepository, OutboxEnvelope, TransactionRepository, UserRepository,
};

use crate::command::{CreateTransaction, UpdateTransaction};
use crate::error::SagaError;
use crate::post_process::PostProcessor;
use crate::state::{SagaRun, SagaState};

/// Application service over the transaction aggregate.
///
/// `create_transaction` is the plain path: validate inline, then one atomic
/// pair write. `create_transaction_with_saga` chains the same steps
/// choreography-style, each step calling the next directly, with the
/// compensation decision made at the call site that observes the failure.
pub struct TransactionService<S, P> {
    storage: Arc<S>,
    post_processor: P,
}

impl<S, P> TransactionService<S, P>
where
    S: UserRepository + CategoryRepository + TransactionRepository,
    P: PostProcessor,
{
    pub fn new(storage: Arc<S>, post_processor: P) -> Self {
        Self {
            storage,
            post_processor,
        }
    }

    /// Creates a transaction and enqueues its `TransactionCreated` envelope
    /// in one atomic unit. No post-processing step.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id))]
    pub async fn create_transaction(
        &self,
        cmd: CreateTransaction,
    ) -> Result<Transaction, SagaError> {
        self.validate_owner(cmd.user_id).await?;
        self.validate_category(&cmd).await?;

        let txn = self
            .storage
            .create_with_event(cmd.into_new_transaction())
            .await?;
        metrics::counter!("transactions_created_total").increment(1);
        tracing::info!(transaction_id = %txn.id, "transaction created");
        Ok(txn)
    }

    /// Choreography-style saga: validate, create, post-process, each step
    /// invoking the next, compensating the create if post-processing fails.
    #[tracing::instrument(skip(self, cmd), fields(user_id = %cmd.user_id, category_id = %cmd.category_id))]
    pub async fn create_transaction_with_saga(
        &self,
        cmd: CreateTransaction,
    ) -> Result<Transaction, SagaError> {
        metrics::counter!("saga_executions_total").increment(1);
        let mut run = SagaRun::new();

        self.validate_owner(cmd.user_id).await?;
        run.advance(SagaState::OwnerValidated);

        self.validate_category(&cmd).await?;
        run.advance(SagaState::CategoryValidated);

        let txn = self
            .storage
            .create_with_event(cmd.into_new_transaction())
            .await?;
        run.advance(SagaState::AggregateCreated);

        if let Err(e) = self.post_processor.process(&txn).await {
            tracing::warn!(
                transaction_id = %txn.id,
                error = %e,
                "post-processing failed, compensating creation"
            );
            run.advance(SagaState::Compensating);
            self.compensate_creation(&txn).await;
            run.advance(SagaState::Compensated);
            metrics::counter!("saga_failed").increment(1);
            return Err(e);
        }
        run.advance(SagaState::PostProcessed);

        metrics::counter!("saga_completed").increment(1);
        tracing::info!(transaction_id = %txn.id, "choreography saga completed");
        Ok(txn)
    }

    /// Deletes a created aggregate as compensation. Best-effort: a failure
    /// is logged and never propagated.
    pub async fn compensate_creation(&self, txn: &Transaction) {
        if let Err(e) = self.storage.delete(txn.id).await {
            tracing::error!(
                transaction_id = %txn.id,
                error = %e,
                "compensation failed, aggregate left in place"
            );
        }
        metrics::counter!("saga_compensations_total").increment(1);
    }

    /// Applies an update and enqueues `TransactionUpdated` atomically.
    #[tracing::instrument(skip(self, cmd))]
    pub async fn update_transaction(
        &self,
        id: TransactionId,
        cmd: UpdateTransaction,
    ) -> Result<Transaction, SagaError> {
        let existing = self
            .storage
            .find_transaction(id)
            .await?
            .ok_or(SagaError::TransactionNotFound(id))?;

        let mut updated = existing.clone();
        updated.category_id = cmd.category_id;
        updated.amount = cmd.amount;
        updated.kind = cmd.kind;
        updated.description = cmd.description;

        let envelope =
            OutboxEnvelope::for_event(&TransactionEvent::updated(&updated, existing.kind))?;
        let txn = self.storage.update_with_event(updated, envelope).await?;
        tracing::info!(transaction_id = %txn.id, "transaction updated");
        Ok(txn)
    }

    /// Deletes a transaction and enqueues `TransactionDeleted` atomically.
    #[tracing::instrument(skip(self))]
    pub async fn delete_transaction(&self, id: TransactionId) -> Result<(), SagaError> {
        let existing = self
            .storage
            .find_transaction(id)
            .await?
            .ok_or(SagaError::TransactionNotFound(id))?;

        let envelope = OutboxEnvelope::for_event(&TransactionEvent::deleted(&existing))?;
        self.storage.delete_with_event(id, envelope).await?;
        tracing::info!(transaction_id = %id, "transaction deleted");
        Ok(())
    }

    /// Fetches a single transaction.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, SagaError> {
        self.storage
            .find_transaction(id)
            .await?
            .ok_or(SagaError::TransactionNotFound(id))
    }

    /// Lists every transaction.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>, SagaError> {
        Ok(self.storage.list_transactions().await?)
    }

    /// Lists transactions belonging to one user.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Transaction>, SagaError> {
        Ok(self.storage.list_for_user(user_id).await?)
    }

    async fn validate_owner(&self, user_id: UserId) -> Result<(), SagaError> {
        self.storage
            .find_user(user_id)
            .await?
            .ok_or(SagaError::OwnerNotFound(user_id))?;
        Ok(())
    }

    async fn validate_category(&self, cmd: &CreateTransaction) -> Result<(), SagaError> {
        self.storage
            .find_category(cmd.category_id)
            .await?
            .ok_or(SagaError::CategoryNotFound(cmd.category_id))?;
        Ok(())
    }
}
