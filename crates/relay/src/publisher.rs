//! Fan-out of a single event to all registered handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::TransactionEvent;

use crate::error::{HandlerError, HandlerFailure, PublishError};

/// A consumer of transaction lifecycle events.
///
/// Handlers run outside the transaction that produced the envelope: work a
/// handler commits is never rolled back by an unrelated upstream failure.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable handler name, used in logs and failure reports.
    fn name(&self) -> &'static str;

    /// Whether this handler wants the given event. Defaults to all events.
    fn interested_in(&self, _event: &TransactionEvent) -> bool {
        true
    }

    /// Processes one event. Must be idempotent: delivery is at-least-once.
    async fn handle(&self, event: &TransactionEvent) -> Result<(), HandlerError>;
}

/// Dispatches one event to every interested handler.
///
/// Handlers for the same event run in registration order. A failing handler
/// does not stop the remaining ones; all failures are aggregated into the
/// returned [`PublishError`] so the relay can decide to retry the record.
#[derive(Default)]
pub struct Publisher {
    handlers: Vec<Arc<dyn EventHandler>>,
    handler_timeout: Option<Duration>,
}

impl Publisher {
    /// Creates a publisher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an optional per-handler deadline. A handler exceeding it is
    /// reported as a failure for that publish.
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Registers a handler. Registration order is invocation order.
    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Dispatches the event to every interested handler.
    #[tracing::instrument(skip(self, event), fields(event_type = event.event_type()))]
    pub async fn publish(&self, event: &TransactionEvent) -> Result<(), PublishError> {
        let mut failures = Vec::new();

        for handler in &self.handlers {
            if !handler.interested_in(event) {
                continue;
            }

            let outcome = match self.handler_timeout {
                Some(deadline) => match tokio::time::timeout(deadline, handler.handle(event)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(HandlerError::new(format!(
                        "timed out after {deadline:?}"
                    ))),
                },
                None => handler.handle(event).await,
            };

            if let Err(e) = outcome {
                tracing::warn!(
                    handler = handler.name(),
                    error = %e,
                    "event handler failed"
                );
                metrics::counter!("publisher_handler_failures_total").increment(1);
                failures.push(HandlerFailure {
                    handler: handler.name(),
                    error: e.to_string(),
                });
            }
        }

        if failures.is_empty() {
            metrics::counter!("publisher_events_published_total").increment(1);
            Ok(())
        } else {
            Err(PublishError { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CategoryId, TransactionId, UserId};
    use domain::{Money, NewTransaction, Transaction, TransactionKind};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_event() -> TransactionEvent {
        let txn: Transaction = NewTransaction::new(
            UserId::new(1),
            CategoryId::new(1),
            Money::from_cents(100),
            TransactionKind::Expense,
            "coffee",
        )
        .with_id(TransactionId::new(1));
        TransactionEvent::created(&txn)
    }

    struct RecordingHandler {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn handle(&self, _event: &TransactionEvent) -> Result<(), HandlerError> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                Err(HandlerError::from("boom"))
            } else {
                Ok(())
            }
        }
    }

    struct DeletedOnlyHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for DeletedOnlyHandler {
        fn name(&self) -> &'static str {
            "deleted_only"
        }

        fn interested_in(&self, event: &TransactionEvent) -> bool {
            matches!(event, TransactionEvent::Deleted(_))
        }

        async fn handle(&self, _event: &TransactionEvent) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl EventHandler for SlowHandler {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn handle(&self, _event: &TransactionEvent) -> Result<(), HandlerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut publisher = Publisher::new();
        for name in ["first", "second", "third"] {
            publisher.register(Arc::new(RecordingHandler {
                name,
                log: log.clone(),
                fail: false,
            }));
        }

        assert_eq!(publisher.handler_count(), 3);
        publisher.publish(&sample_event()).await.unwrap();
        assert_eq!(*log.lock().unwrap(), ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut publisher = Publisher::new();
        publisher.register(Arc::new(RecordingHandler {
            name: "ok_before",
            log: log.clone(),
            fail: false,
        }));
        publisher.register(Arc::new(RecordingHandler {
            name: "broken",
            log: log.clone(),
            fail: true,
        }));
        publisher.register(Arc::new(RecordingHandler {
            name: "ok_after",
            log: log.clone(),
            fail: false,
        }));

        let err = publisher.publish(&sample_event()).await.unwrap_err();

        assert_eq!(*log.lock().unwrap(), ["ok_before", "broken", "ok_after"]);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].handler, "broken");
        assert_eq!(err.failures[0].error, "boom");
    }

    #[tokio::test]
    async fn all_failures_are_aggregated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut publisher = Publisher::new();
        for name in ["a", "b"] {
            publisher.register(Arc::new(RecordingHandler {
                name,
                log: log.clone(),
                fail: true,
            }));
        }

        let err = publisher.publish(&sample_event()).await.unwrap_err();
        assert_eq!(err.failures.len(), 2);
    }

    #[tokio::test]
    async fn uninterested_handlers_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut publisher = Publisher::new();
        publisher.register(Arc::new(DeletedOnlyHandler {
            calls: calls.clone(),
        }));

        publisher.publish(&sample_event()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn handler_exceeding_deadline_is_a_failure() {
        let mut publisher =
            Publisher::new().with_handler_timeout(Some(Duration::from_millis(50)));
        publisher.register(Arc::new(SlowHandler));

        let err = publisher.publish(&sample_event()).await.unwrap_err();
        assert_eq!(err.failures[0].handler, "slow");
        assert!(err.failures[0].error.contains("timed out"));
    }

    #[tokio::test]
    async fn publish_with_no_handlers_is_ok() {
        let publisher = Publisher::new();
        assert!(publisher.publish(&sample_event()).await.is_ok());
    }
}
