use thiserror::Error;

/// Errors raised by the domain layer.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An outbox record carried an event type no variant maps to.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// An event payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
