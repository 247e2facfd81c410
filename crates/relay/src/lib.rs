//! Outbox relay: periodic delivery of pending envelopes to event handlers.
//!
//! The relay pulls bounded batches of undelivered records in FIFO order,
//! resolves each back to its event variant, and fans it out through the
//! [`Publisher`]. Delivery is at-least-once: a record is marked delivered
//! only after every handler ran, and any failure leaves it in place to be
//! retried on the next tick.

pub mod error;
pub mod handlers;
pub mod publisher;
pub mod scheduler;

pub use error::{HandlerError, HandlerFailure, PublishError};
pub use handlers::{SpendingPatternAnalyzer, TransactionLogger};
pub use publisher::{EventHandler, Publisher};
pub use scheduler::{OutboxRelay, RelayConfig, RelayHandle};
