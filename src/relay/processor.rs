//! Event relay loop
//!
//! Query → redact → deliver → advance watermark → sleep, until stopped.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::watermark::{AdvancePolicy, Watermark, WatermarkStore};
use crate::event::{RedactionList, SearchFilter};
use crate::source::EventSource;
use crate::utils::{DeliveryError, RelayError, SourceError};
use crate::webhook::EventSink;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Summary of one query/deliver cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Events returned by the source
    pub fetched: usize,
    pub delivered: usize,
    /// Events whose delivery hit a transport error
    pub failed: usize,
    /// Watermark after the cycle
    pub watermark: Watermark,
    /// Set when the source query failed and the cycle was treated as empty
    pub source_error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Relay that polls an event source and forwards to a sink
pub struct EventRelay<S: EventSource, K: EventSink> {
    source: S,
    sink: K,
    redaction: RedactionList,
    filter: SearchFilter,
    watermark: Watermark,
    policy: AdvancePolicy,
    poll_interval: Duration,
    store: Option<WatermarkStore>,
}

impl<S: EventSource, K: EventSink> EventRelay<S, K> {
    /// Create a relay starting from the given watermark
    pub fn new(source: S, sink: K, watermark: Watermark) -> Self {
        Self {
            source,
            sink,
            redaction: RedactionList::default(),
            filter: SearchFilter::default(),
            watermark,
            policy: AdvancePolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            store: None,
        }
    }

    pub fn with_redaction(mut self, redaction: RedactionList) -> Self {
        self.redaction = redaction;
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_policy(mut self, policy: AdvancePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Persist the watermark after every cycle that moves it
    pub fn with_store(mut self, store: WatermarkStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Run one query/deliver cycle.
    ///
    /// A failed query yields an empty cycle. A transport failure while
    /// delivering is logged and the batch continues.
    ///
    /// # Errors
    /// Any other delivery error (event serialization) is returned as-is.
    pub async fn run_once(&mut self) -> Result<CycleReport, DeliveryError> {
        let cycle_id = Uuid::new_v4();
        self.process_cycle(cycle_id).await
    }

    #[instrument(skip(self), fields(start_watermark = self.watermark.value()))]
    async fn process_cycle(&mut self, cycle_id: Uuid) -> Result<CycleReport, DeliveryError> {
        let start = self.watermark;
        info!(watermark = start.value(), "Getting new events with id greater than watermark");

        let (events, source_error) = match self.source.fetch_after(start.value(), &self.filter).await {
            Ok(events) => (events, None),
            Err(e) => {
                log_source_error(&e);
                (Vec::new(), Some(e.to_string()))
            }
        };

        let fetched = events.len();
        info!(count = fetched, "Events were returned");

        let mut outcomes = Vec::with_capacity(fetched);
        let mut delivered = 0;
        let mut failed = 0;

        for mut event in events {
            self.redaction.apply(&mut event);
            debug!(event_id = event.id(), "Sending event to webhook");

            let result = self.sink.deliver(&event).await;
            let ok = match result {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(DeliveryError::Transport(reason)) => {
                    error!(event_id = event.id(), error = %reason, "Failed to deliver event");
                    failed += 1;
                    false
                }
                Err(e) => {
                    // keep what was already handled in this batch
                    self.settle_batch(start, &outcomes);
                    return Err(e);
                }
            };

            outcomes.push((event.id(), ok));
        }

        self.settle_batch(start, &outcomes);
        if failed > 0 && self.policy == AdvancePolicy::AdvanceOnDelivery {
            warn!(
                watermark = self.watermark.value(),
                failed, "Holding watermark below undelivered events"
            );
        }

        info!(watermark = self.watermark.value(), delivered, failed, "Watermark is now");

        Ok(CycleReport {
            cycle_id,
            fetched,
            delivered,
            failed,
            watermark: self.watermark,
            source_error,
            completed_at: Utc::now(),
        })
    }

    /// Apply the advance policy to a batch and persist the result if it moved.
    fn settle_batch(&mut self, start: Watermark, outcomes: &[(i64, bool)]) {
        self.watermark = self.policy.settle(start, outcomes);
        if self.watermark != start {
            self.persist_watermark();
        }
    }

    fn persist_watermark(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(self.watermark) {
                warn!(error = %e, "Failed to persist watermark, continuing");
            }
        }
    }

    /// Run the relay loop until the stop signal turns `true`.
    ///
    /// The stop signal is checked before each cycle and interrupts the sleep
    /// between cycles; an in-flight cycle always completes.
    #[instrument(skip(self, stop), level = "info")]
    pub async fn run(&mut self, mut stop: watch::Receiver<bool>) -> Result<(), RelayError> {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            watermark = self.watermark.value(),
            policy = ?self.policy,
            "Starting event relay loop"
        );

        loop {
            if *stop.borrow() {
                break;
            }

            self.run_once().await?;

            info!(seconds = self.poll_interval.as_secs(), "Sleeping");
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = wait_for_stop(&mut stop) => {
                    info!("Stop signal received during sleep");
                    break;
                }
            }
        }

        info!(watermark = self.watermark.value(), "Event relay loop stopped");
        Ok(())
    }

    /// Run a fixed number of cycles back to back, without sleeping.
    ///
    /// Useful for testing
    pub async fn run_iterations(&mut self, iterations: usize) -> Result<Vec<CycleReport>, RelayError> {
        let mut reports = Vec::with_capacity(iterations);
        for _ in 0..iterations {
            reports.push(self.run_once().await?);
        }
        Ok(reports)
    }
}

fn log_source_error(error: &SourceError) {
    match error {
        SourceError::Auth { .. } => {
            error!(category = error.category(), error = %error, "Event query failed, treating as empty")
        }
        _ => warn!(category = error.category(), error = %error, "Event query failed, treating as empty"),
    }
}

/// Resolve once the stop flag is `true`. Pends forever if the sender is gone.
async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
