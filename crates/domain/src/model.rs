//! The transaction aggregate and its referenced entities.

use chrono::{DateTime, Utc};
use common::{CategoryId, TransactionId, UserId};
use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a new Money amount from a whole major-unit value
    /// (e.g. `from_major(100)` is 100.00).
    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn as_cents(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Whether a transaction moves money out of or into the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    /// Returns the kind name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Expense => "EXPENSE",
            TransactionKind::Income => "INCOME",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user who owns transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// A spending category a transaction is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// The transaction aggregate.
///
/// A transaction exists in storage only if its creation event was appended
/// to the outbox in the same atomic unit; the repositories enforce this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub amount: Money,
    pub kind: TransactionKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// A transaction awaiting its storage-assigned ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub amount: Money,
    pub kind: TransactionKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

impl NewTransaction {
    /// Builds a new transaction occurring now.
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
            occurred_at: Utc::now(),
        }
    }

    /// Attaches the storage-assigned ID, producing the persisted aggregate.
    pub fn with_id(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            user_id: self.user_id,
            category_id: self.category_id,
            amount: self.amount,
            kind: self.kind,
            description: self.description,
            occurred_at: self.occurred_at,
        }
    }
}
