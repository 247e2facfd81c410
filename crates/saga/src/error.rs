//! Saga error types.

use common::{CategoryId, TransactionId, UserId};
use storage::StorageError;
use thiserror::Error;

/// Errors that can occur during saga operations.
///
/// A compensation failure is never surfaced here: compensation is
/// best-effort, its failure is logged and the caller sees the error that
/// triggered it.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The owning user does not exist.
    #[error("User not found: {0}")]
    OwnerNotFound(UserId),

    /// The category does not exist.
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// The transaction does not exist.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The post-processing step failed.
    #[error("Post-processing failed: {0}")]
    PostProcess(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
