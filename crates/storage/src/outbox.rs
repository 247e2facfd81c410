//! The outbox contract: pending event envelopes and their delivery state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::EventId;
use domain::TransactionEvent;
use serde::{Deserialize, Serialize};

use crate::Result;

/// An immutable, serialized domain event awaiting delivery.
///
/// `event_type` is the variant tag of [`TransactionEvent`]; it must resolve
/// back to the same variant at delivery time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEnvelope {
    pub event_id: EventId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl OutboxEnvelope {
    /// Wraps a domain event for the outbox, assigning a fresh event ID.
    pub fn for_event(event: &TransactionEvent) -> Result<Self> {
        Ok(Self {
            event_id: EventId::new(),
            event_type: event.event_type().to_string(),
            payload: event.payload()?,
            created_at: Utc::now(),
        })
    }

    /// Builds an envelope from raw parts. Mainly useful in tests.
    pub fn from_parts(
        event_type: impl Into<String>,
        payload: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            payload,
            created_at,
        }
    }
}

/// A durable outbox row: an envelope plus its delivery state.
///
/// Records are created only inside the same atomic unit as a business write,
/// mutated only by [`OutboxStore::mark_delivered`], and never deleted — the
/// outbox doubles as an append-only audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    /// Auto-incremented insertion order, used as the FIFO tie-breaker.
    pub sequence_id: i64,
    pub envelope: OutboxEnvelope,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Durable table of envelopes pending delivery.
///
/// Appending happens through the repository pair writes (see
/// [`crate::repository::TransactionRepository`]); this trait covers the
/// relay side: pulling undelivered records and flipping their state.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Returns up to `max` undelivered records, ordered by `created_at`
    /// ascending with ties broken by `sequence_id` ascending (FIFO).
    async fn fetch_undelivered(&self, max: usize) -> Result<Vec<OutboxRecord>>;

    /// Marks the record with the given event ID as delivered.
    ///
    /// Idempotent: marking an already-delivered record is a no-op returning
    /// `Ok`. Returns [`crate::StorageError::OutboxRecordNotFound`] if no
    /// record exists for the ID.
    async fn mark_delivered(&self, event_id: EventId) -> Result<()>;
}
