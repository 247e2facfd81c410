//! Business repository contracts.
//!
//! Write operations that emit events take (or build) the event envelope
//! inside the same atomic unit as the business write — the explicit
//! replacement for annotation-driven transaction boundaries. If the unit
//! fails, neither the business row nor the envelope persists.

use async_trait::async_trait;
use common::{CategoryId, TransactionId, UserId};
use domain::{Category, NewTransaction, Transaction, User};

use crate::Result;
use crate::outbox::OutboxEnvelope;

/// Lookup for transaction owners.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;
}

/// Lookup for spending categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_category(&self, id: CategoryId) -> Result<Option<Category>>;
}

/// Persistence for the transaction aggregate.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Atomically persists the transaction and appends its
    /// `TransactionCreated` envelope.
    ///
    /// The envelope is built inside the atomic unit because its payload
    /// carries the storage-assigned ID. On failure neither the aggregate
    /// nor the envelope exists.
    async fn create_with_event(&self, new: NewTransaction) -> Result<Transaction>;

    /// Atomically replaces the stored transaction and appends the given
    /// envelope (a `TransactionUpdated` event built by the caller).
    async fn update_with_event(
        &self,
        txn: Transaction,
        envelope: OutboxEnvelope,
    ) -> Result<Transaction>;

    /// Atomically deletes the transaction and appends the given envelope
    /// (a `TransactionDeleted` event built by the caller).
    async fn delete_with_event(&self, id: TransactionId, envelope: OutboxEnvelope) -> Result<()>;

    /// Deletes the transaction without emitting an event.
    ///
    /// Used only by saga compensation, which undoes the business write but
    /// never retracts the already-appended creation envelope.
    async fn delete(&self, id: TransactionId) -> Result<()>;

    /// Point lookup by ID.
    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// Lists all transactions.
    async fn list_transactions(&self) -> Result<Vec<Transaction>>;

    /// Lists the transactions owned by a user.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Transaction>>;
}
