//! Partition Worker - Delivers received batches for a single partition
//!
//! Each partition gets its own worker with a bounded channel, ensuring:
//! 1. Notifications are delivered in receive order within the partition
//! 2. Only one handler call runs per partition at any time
//! 3. Partitions are processed in parallel with each other
//!
//! Receiving from the stream happens elsewhere; the worker only turns each
//! `ReceivedBatch` into a `BatchDeliveryNotification` and waits for the handler.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::checkpoint::{CheckpointStore, PartitionCheckpointer};
use crate::handler::BatchHandler;
use crate::metrics_consts::{
    EVENTS_DELIVERED, HANDLER_DURATION, HANDLER_ERRORS, NOTIFICATIONS_DELIVERED,
};
use crate::notification::BatchDeliveryNotification;
use crate::types::{EventRecord, PartitionContext};

/// The outcome of one receive attempt against a partition
#[derive(Debug, Clone)]
pub struct ReceivedBatch {
    events: Option<Vec<EventRecord>>,
}

impl ReceivedBatch {
    pub fn events(events: Vec<EventRecord>) -> Self {
        Self {
            events: Some(events),
        }
    }

    /// The receive attempt ended without any events
    pub fn timeout() -> Self {
        Self { events: None }
    }

    pub fn is_timeout(&self) -> bool {
        self.events.is_none()
    }

    pub fn event_count(&self) -> usize {
        self.events.as_ref().map_or(0, Vec::len)
    }

    pub fn max_sequence_number(&self) -> Option<i64> {
        self.events
            .as_ref()
            .and_then(|events| events.iter().map(EventRecord::sequence_number).max())
    }
}

/// Configuration for partition workers
#[derive(Debug, Clone)]
pub struct PartitionWorkerConfig {
    /// Size of the channel buffer per partition
    pub channel_buffer_size: usize,
}

impl Default for PartitionWorkerConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 10, // Buffer up to 10 batches per partition
        }
    }
}

/// A worker that delivers batches for a single partition
pub struct PartitionWorker {
    partition: Arc<PartitionContext>,
    sender: mpsc::Sender<ReceivedBatch>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PartitionWorker {
    /// Create a new partition worker
    ///
    /// The worker stops when `shutdown` cancels the parent token, when `revoke`
    /// is called, or when the worker is shut down and its queue is drained.
    pub fn new<H>(
        partition: Arc<PartitionContext>,
        handler: Arc<H>,
        store: Arc<dyn CheckpointStore>,
        config: &PartitionWorkerConfig,
        shutdown: &CancellationToken,
    ) -> Self
    where
        H: BatchHandler + 'static,
    {
        let (sender, receiver) = mpsc::channel(config.channel_buffer_size);
        let cancel = shutdown.child_token();

        let handle = tokio::spawn(Self::run_worker(
            partition.clone(),
            receiver,
            handler,
            store,
            cancel.clone(),
        ));

        Self {
            partition,
            sender,
            cancel,
            handle: Some(handle),
        }
    }

    /// Send a batch to this worker for delivery
    /// Awaits until channel has capacity. Returns error only if the worker has stopped
    pub async fn send(
        &self,
        batch: ReceivedBatch,
    ) -> Result<(), mpsc::error::SendError<ReceivedBatch>> {
        self.sender.send(batch).await
    }

    /// Try to send a batch without blocking
    /// Returns error if the channel is full or closed
    pub fn try_send(
        &self,
        batch: ReceivedBatch,
    ) -> Result<(), mpsc::error::TrySendError<ReceivedBatch>> {
        self.sender.try_send(batch)
    }

    /// Get the current capacity of the channel
    pub fn capacity(&self) -> usize {
        self.sender.capacity()
    }

    /// Get the partition this worker handles
    pub fn partition(&self) -> &PartitionContext {
        &self.partition
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Shutdown the worker gracefully, delivering everything already queued
    pub async fn shutdown(mut self) {
        // Drop the sender to signal the worker to stop
        drop(self.sender);

        if let Some(handle) = self.handle.take() {
            match handle.await {
                Ok(()) => {
                    debug!(
                        consumer_group = self.partition.consumer_group(),
                        partition_id = self.partition.partition_id(),
                        "Partition worker shut down gracefully"
                    );
                }
                Err(e) => {
                    warn!(
                        consumer_group = self.partition.consumer_group(),
                        partition_id = self.partition.partition_id(),
                        error = %e,
                        "Partition worker panicked during shutdown"
                    );
                }
            }
        }
    }

    /// Stop delivering because ownership of the partition moved elsewhere
    ///
    /// The running handler sees its notification cancelled and is awaited; queued
    /// batches are dropped without delivery.
    pub async fn revoke(self) {
        info!(
            consumer_group = self.partition.consumer_group(),
            partition_id = self.partition.partition_id(),
            "Revoking partition worker"
        );
        self.cancel.cancel();
        self.shutdown().await;
    }

    /// The main worker loop
    async fn run_worker<H>(
        partition: Arc<PartitionContext>,
        mut receiver: mpsc::Receiver<ReceivedBatch>,
        handler: Arc<H>,
        store: Arc<dyn CheckpointStore>,
        cancel: CancellationToken,
    ) where
        H: BatchHandler + 'static,
    {
        info!(
            consumer_group = partition.consumer_group(),
            partition_id = partition.partition_id(),
            "Starting partition worker"
        );

        loop {
            let batch = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(
                        consumer_group = partition.consumer_group(),
                        partition_id = partition.partition_id(),
                        "Partition worker cancelled - queued batches will not be delivered"
                    );
                    break;
                }
                batch = receiver.recv() => match batch {
                    Some(batch) => batch,
                    None => break,
                },
            };

            Self::deliver(&partition, handler.as_ref(), &store, &cancel, batch).await;
        }

        info!(
            consumer_group = partition.consumer_group(),
            partition_id = partition.partition_id(),
            "Partition worker shutting down"
        );
    }

    async fn deliver<H>(
        partition: &Arc<PartitionContext>,
        handler: &H,
        store: &Arc<dyn CheckpointStore>,
        cancel: &CancellationToken,
        batch: ReceivedBatch,
    ) where
        H: BatchHandler,
    {
        let consumer_group = partition.consumer_group().to_string();
        let partition_id = partition.partition_id().to_string();
        let event_count = batch.event_count();
        let is_timeout = batch.is_timeout();
        let max_sequence_number = batch.max_sequence_number();

        let committer = PartitionCheckpointer::for_batch(
            store.clone(),
            partition.clone(),
            batch.events.as_deref(),
        );
        let notification = BatchDeliveryNotification::from_batch(
            Some(partition.clone()),
            batch.events,
            Arc::new(committer),
            Some(cancel.child_token()),
        );

        debug!(
            consumer_group = consumer_group.as_str(),
            partition_id = partition_id.as_str(),
            event_count = event_count,
            timeout = is_timeout,
            max_sequence_number = ?max_sequence_number,
            "Delivering batch"
        );

        let started = Instant::now();
        let result = handler.handle(notification).await;

        metrics::histogram!(
            HANDLER_DURATION,
            "consumer_group" => consumer_group.clone(),
            "partition" => partition_id.clone()
        )
        .record(started.elapsed().as_secs_f64());
        metrics::counter!(
            NOTIFICATIONS_DELIVERED,
            "consumer_group" => consumer_group.clone(),
            "partition" => partition_id.clone()
        )
        .increment(1);
        metrics::counter!(
            EVENTS_DELIVERED,
            "consumer_group" => consumer_group.clone(),
            "partition" => partition_id.clone()
        )
        .increment(event_count as u64);

        if let Err(e) = result {
            error!(
                consumer_group = consumer_group.as_str(),
                partition_id = partition_id.as_str(),
                event_count = event_count,
                max_sequence_number = ?max_sequence_number,
                error = %e,
                error_chain = ?e,
                "Batch handler failed"
            );
            metrics::counter!(
                HANDLER_ERRORS,
                "consumer_group" => consumer_group,
                "partition" => partition_id
            )
            .increment(1);
        }
    }
}
