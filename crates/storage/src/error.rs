use common::{EventId, TransactionId};
use thiserror::Error;

/// Errors that can occur when interacting with storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The transaction was not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// No outbox record exists for the given event ID.
    #[error("Outbox record not found for event: {0}")]
    OutboxRecordNotFound(EventId),

    /// The storage backend refused the operation (connectivity, injected
    /// failure). Guarantees no partial write happened.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
