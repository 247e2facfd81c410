//! Shared identifier types used across the finance outbox system.

pub mod types;

pub use types::{CategoryId, EventId, TransactionId, UserId};
