//! Commands accepted by the transaction service and saga coordinator.

use common::{CategoryId, UserId};
use domain::{Money, NewTransaction, TransactionKind};

/// Request to create a transaction for a user in a category.
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub amount: Money,
    pub kind: TransactionKind,
    pub description: String,
}

impl CreateTransaction {
    pub fn new(
        user_id: UserId,
        category_id: CategoryId,
        amount: Money,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            category_id,
            amount,
            kind,
            description: description.into(),
        }
    }

    /// Converts the command into the row awaiting a storage-assigned ID.
    pub fn into_new_transaction(self) -> NewTransaction {
        NewTransaction::new(
            self.user_id,
            self.category_id,
            self.amount,
            self.kind,
            self.description,
        )
    }
}

/// Request to change an existing transaction's mutable fields.
#[derive(Debug, Clone)]
pub struct UpdateTransaction {
    pub category_id: CategoryId,
    pub amount: Money,
    pub kind: TransactionKind,
    pub description: String,
}

impl UpdateTransaction {
    pub fn new(
        category_id: CategoryId,
        amount: Money,
        kind: TransactionKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category_id,
            amount,
            kind,
            description: description.into(),
        }
    }
}
