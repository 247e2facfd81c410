//! Storage layer: the transactional outbox and the business repositories.
//!
//! The central invariant lives here: a business write and its event envelope
//! are persisted in one atomic unit, or not at all. Two implementations are
//! provided — [`InMemoryStorage`] (a single lock over all tables, used for
//! tests and the default composition) and [`PostgresStorage`] (one sqlx
//! transaction per pair write).

pub mod error;
pub mod memory;
pub mod outbox;
pub mod postgres;
pub mod repository;

pub use error::{Result, StorageError};
pub use memory::InMemoryStorage;
pub use outbox::{OutboxEnvelope, OutboxRecord, OutboxStore};
pub use postgres::PostgresStorage;
pub use repository::{CategoryRepository, TransactionRepository, UserRepository};
