//! Shared test doubles for the batch-delivery crate.
//!
//! Used by the `mod tests` blocks and by the integration tests under `tests/`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::checkpoint::CheckpointCommitter;
use crate::error::CheckpointError;
use crate::handler::BatchHandler;
use crate::notification::BatchDeliveryNotification;

/// Committer that records the token of every call
///
/// Honours cancellation like a real committer: a cancelled token is recorded and
/// reported as `CheckpointError::Cancelled` without counting as completed.
#[derive(Default)]
pub struct RecordingCommitter {
    tokens: Mutex<Vec<CancellationToken>>,
    completed: AtomicUsize,
}

impl RecordingCommitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn recorded_tokens(&self) -> Vec<CancellationToken> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckpointCommitter for RecordingCommitter {
    async fn commit(&self, cancel: &CancellationToken) -> Result<(), CheckpointError> {
        self.tokens.lock().unwrap().push(cancel.clone());

        if cancel.is_cancelled() {
            return Err(CheckpointError::Cancelled);
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// What a handler observed for one delivery
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    pub partition_id: Option<String>,
    pub sequence_numbers: Option<Vec<i64>>,
    pub has_events: bool,
    pub was_cancelled: bool,
    pub commit_outcome: Option<String>,
}

/// Handler that records every delivery and optionally commits each one
#[derive(Default)]
pub struct RecordingHandler {
    deliveries: Mutex<Vec<DeliveryRecord>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    commit: bool,
    delay: Option<Duration>,
    fail_every_delivery: bool,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a checkpoint for every delivery that carries events
    pub fn committing(mut self) -> Self {
        self.commit = true;
        self
    }

    /// Sleep inside each delivery, ignoring cancellation
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_every_delivery = true;
        self
    }

    pub fn deliveries(&self) -> Vec<DeliveryRecord> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }

    /// Highest number of deliveries observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchHandler for RecordingHandler {
    async fn handle(&self, notification: BatchDeliveryNotification) -> Result<()> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let commit_outcome = if self.commit && notification.has_events() {
            Some(match notification.commit_checkpoint().await {
                Ok(()) => "committed".to_string(),
                Err(e) => e.kind().to_string(),
            })
        } else {
            None
        };

        let record = DeliveryRecord {
            partition_id: notification
                .partition()
                .map(|p| p.partition_id().to_string()),
            sequence_numbers: notification
                .events()
                .map(|events| events.iter().map(|e| e.sequence_number()).collect()),
            has_events: notification.has_events(),
            was_cancelled: notification.is_cancelled(),
            commit_outcome,
        };
        self.deliveries.lock().unwrap().push(record);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_every_delivery {
            return Err(anyhow::anyhow!("simulated handler failure"));
        }
        Ok(())
    }
}
