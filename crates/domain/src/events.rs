//! Transaction lifecycle events.
//!
//! The event set is closed: each variant has a stable `event_type` tag that
//! is stored alongside the serialized payload, so the relay can resolve an
//! outbox record back to the exact variant without runtime type discovery.

use chrono::{DateTime, Utc};
use common::{CategoryId, TransactionId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::model::{Money, Transaction, TransactionKind};

/// A domain occurrence on the transaction aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionEvent {
    /// A transaction was created.
    Created(TransactionCreatedData),

    /// A transaction's fields were changed.
    Updated(TransactionUpdatedData),

    /// A transaction was deleted.
    Deleted(TransactionDeletedData),
}

/// Payload for the `TransactionCreated` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCreatedData {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub amount: Money,
    pub kind: TransactionKind,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

/// Payload for the `TransactionUpdated` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionUpdatedData {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub amount: Money,
    pub old_kind: TransactionKind,
    pub new_kind: TransactionKind,
    pub description: String,
}

/// Payload for the `TransactionDeleted` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDeletedData {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub category_id: CategoryId,
    pub kind: TransactionKind,
}

impl TransactionEvent {
    /// Builds a `TransactionCreated` event from a persisted aggregate.
    pub fn created(txn: &Transaction) -> Self {
        TransactionEvent::Created(TransactionCreatedData {
            transaction_id: txn.id,
            user_id: txn.user_id,
            category_id: txn.category_id,
            amount: txn.amount,
            kind: txn.kind,
            description: txn.description.clone(),
            occurred_at: txn.occurred_at,
        })
    }

    /// Builds a `TransactionUpdated` event, recording the previous kind.
    pub fn updated(txn: &Transaction, old_kind: TransactionKind) -> Self {
        TransactionEvent::Updated(TransactionUpdatedData {
            transaction_id: txn.id,
            user_id: txn.user_id,
            category_id: txn.category_id,
            amount: txn.amount,
            old_kind,
            new_kind: txn.kind,
            description: txn.description.clone(),
        })
    }

    /// Builds a `TransactionDeleted` event from the aggregate being removed.
    pub fn deleted(txn: &Transaction) -> Self {
        TransactionEvent::Deleted(TransactionDeletedData {
            transaction_id: txn.id,
            user_id: txn.user_id,
            category_id: txn.category_id,
            kind: txn.kind,
        })
    }

    /// Returns the stable tag stored in the outbox `event_type` column.
    pub fn event_type(&self) -> &'static str {
        match self {
            TransactionEvent::Created(_) => "TransactionCreated",
            TransactionEvent::Updated(_) => "TransactionUpdated",
            TransactionEvent::Deleted(_) => "TransactionDeleted",
        }
    }

    /// Serializes the event payload (the variant data, without the tag).
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            TransactionEvent::Created(data) => serde_json::to_value(data),
            TransactionEvent::Updated(data) => serde_json::to_value(data),
            TransactionEvent::Deleted(data) => serde_json::to_value(data),
        }
    }

    /// Resolves an `event_type` tag and payload back to the event variant.
    pub fn decode(event_type: &str, payload: &serde_json::Value) -> Result<Self, DomainError> {
        match event_type {
            "TransactionCreated" => Ok(TransactionEvent::Created(serde_json::from_value(
                payload.clone(),
            )?)),
            "TransactionUpdated" => Ok(TransactionEvent::Updated(serde_json::from_value(
                payload.clone(),
            )?)),
            "TransactionDeleted" => Ok(TransactionEvent::Deleted(serde_json::from_value(
                payload.clone(),
            )?)),
            other => Err(DomainError::UnknownEventType(other.to_string())),
        }
    }

    /// The transaction this event concerns.
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            TransactionEvent::Created(data) => data.transaction_id,
            TransactionEvent::Updated(data) => data.transaction_id,
            TransactionEvent::Deleted(data) => data.transaction_id,
        }
    }
}
