//! Domain layer for the finance outbox system.
//!
//! Defines the `Transaction` aggregate, its referenced entities, and the
//! closed set of lifecycle events (`TransactionEvent`) that flow through the
//! transactional outbox.

pub mod error;
pub mod events;
pub mod model;

pub use error::DomainError;
pub use events::{
    TransactionCreatedData, TransactionDeletedData, TransactionEvent, TransactionUpdatedData,
};
pub use model::{Category, Money, NewTransaction, Transaction, TransactionKind, User};
