//! Saga pattern over the transaction aggregate.
//!
//! Creating a transaction is a multi-step flow: validate the owner, validate
//! the category, persist the aggregate together with its outbox envelope in
//! one atomic unit, then post-process. Two styles drive the same steps:
//!
//! - orchestration: [`SagaCoordinator`] sequences every step centrally;
//! - choreography: [`TransactionService::create_transaction_with_saga`]
//!   chains the steps directly, each calling the next.
//!
//! On a failure after the aggregate exists, compensation deletes it. The
//! outbox envelope survives compensation: the audit trail is append-only.

pub mod command;
pub mod coordinator;
pub mod error;
pub mod post_process;
pub mod service;
pub mod state;

pub use command::{CreateTransaction, UpdateTransaction};
pub use coordinator::SagaCoordinator;
pub use error::SagaError;
pub use post_process::{PostProcessor, SpendingAnalyzer};
pub use service::TransactionService;
pub use state::{SagaRun, SagaState};
