//! Periodic outbox polling and delivery.

use std::sync::Arc;
use std::time::Duration;

use domain::TransactionEvent;
use storage::OutboxStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::publisher::Publisher;

/// Tuning knobs for the relay loop.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum number of records drained per tick.
    pub batch_size: usize,
    /// Interval between polls of the outbox.
    pub period: Duration,
    /// Optional per-handler deadline applied by the publisher.
    pub handler_timeout: Option<Duration>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            period: Duration::from_secs(5),
            handler_timeout: None,
        }
    }
}

/// Drains undelivered outbox records and dispatches them to handlers.
///
/// Exactly one relay task polls a given store, so records are delivered in
/// creation order without a claim protocol. A record is marked delivered only
/// after every handler accepted it; anything short of that leaves the record
/// in place for the next tick, so delivery is at-least-once and handlers must
/// tolerate replays.
pub struct OutboxRelay<S> {
    store: Arc<S>,
    publisher: Publisher,
    config: RelayConfig,
}

/// Handle for a spawned relay task.
pub struct RelayHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Signals the relay loop to stop and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    /// Aborts the relay task without waiting for the current tick.
    pub fn abort(self) {
        self.task.abort();
    }
}

impl<S: OutboxStore + 'static> OutboxRelay<S> {
    pub fn new(store: Arc<S>, mut publisher: Publisher, config: RelayConfig) -> Self {
        publisher = publisher.with_handler_timeout(config.handler_timeout);
        Self {
            store,
            publisher,
            config,
        }
    }

    /// Performs one poll-and-deliver pass. Returns the number of records
    /// marked delivered.
    ///
    /// Each record is handled independently: a record that fails to decode or
    /// to publish is logged and left undelivered, and the pass moves on to
    /// the next one.
    #[tracing::instrument(skip(self))]
    pub async fn tick(&self) -> usize {
        let batch = match self.store.fetch_undelivered(self.config.batch_size).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch undelivered outbox records");
                return 0;
            }
        };

        if batch.is_empty() {
            return 0;
        }

        tracing::debug!(count = batch.len(), "draining outbox batch");
        let mut delivered = 0;

        for record in batch {
            let event_id = record.envelope.event_id;
            let event = match TransactionEvent::decode(
                &record.envelope.event_type,
                &record.envelope.payload,
            ) {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(
                        %event_id,
                        event_type = record.envelope.event_type,
                        error = %e,
                        "undecodable outbox record, will retry"
                    );
                    metrics::counter!("outbox_relay_retries_total").increment(1);
                    continue;
                }
            };

            if let Err(e) = self.publisher.publish(&event).await {
                tracing::warn!(
                    %event_id,
                    event_type = event.event_type(),
                    error = %e,
                    "delivery failed, record stays queued"
                );
                metrics::counter!("outbox_relay_retries_total").increment(1);
                continue;
            }

            match self.store.mark_delivered(event_id).await {
                Ok(()) => {
                    tracing::info!(%event_id, event_type = event.event_type(), "event delivered");
                    metrics::counter!("outbox_relay_delivered_total").increment(1);
                    delivered += 1;
                }
                Err(e) => {
                    // Handlers already ran; the replay on the next tick is
                    // the at-least-once contract at work.
                    tracing::error!(%event_id, error = %e, "failed to mark record delivered");
                    metrics::counter!("outbox_relay_retries_total").increment(1);
                }
            }
        }

        delivered
    }

    /// Spawns the relay loop on the current runtime.
    pub fn spawn(self) -> RelayHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let period = self.config.period;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(
                period_ms = period.as_millis() as u64,
                batch_size = self.config.batch_size,
                "outbox relay started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::info!("outbox relay stopping");
                        break;
                    }
                }
            }
        });

        RelayHandle { shutdown, task }
    }
}
