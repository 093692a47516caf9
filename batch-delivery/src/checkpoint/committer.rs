use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::checkpoint::store::{Checkpoint, CheckpointStore};
use crate::error::CheckpointError;
use crate::metrics_consts::{CHECKPOINTS_COMMITTED, CHECKPOINT_COMMIT_FAILURES};
use crate::types::{CheckpointPosition, EventRecord, PartitionContext};

/// Capability to durably record progress for one delivered batch
///
/// Created by the receive loop, which knows the partition and how far the batch
/// reached, and handed to the notification at construction. Callers pass the
/// token they want honoured; implementations must return
/// `CheckpointError::Cancelled` instead of starting new work once it fires.
#[async_trait]
pub trait CheckpointCommitter: Send + Sync {
    async fn commit(&self, cancel: &CancellationToken) -> Result<(), CheckpointError>;
}

/// Committer bound to a partition and the position of the last event of a batch
pub struct PartitionCheckpointer {
    store: Arc<dyn CheckpointStore>,
    partition: Arc<PartitionContext>,
    position: Option<CheckpointPosition>,
}

impl PartitionCheckpointer {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        partition: Arc<PartitionContext>,
        position: Option<CheckpointPosition>,
    ) -> Self {
        Self {
            store,
            partition,
            position,
        }
    }

    /// Bind to the furthest event of a received batch. `None` (timeout) or an
    /// empty batch leaves the committer without a position.
    pub fn for_batch(
        store: Arc<dyn CheckpointStore>,
        partition: Arc<PartitionContext>,
        events: Option<&[EventRecord]>,
    ) -> Self {
        let position = events
            .and_then(|events| events.last())
            .map(EventRecord::position);
        Self::new(store, partition, position)
    }

    pub fn partition(&self) -> &PartitionContext {
        &self.partition
    }

    pub fn position(&self) -> Option<CheckpointPosition> {
        self.position
    }

    async fn write(
        &self,
        cancel: &CancellationToken,
    ) -> Result<CheckpointPosition, CheckpointError> {
        if cancel.is_cancelled() {
            return Err(CheckpointError::Cancelled);
        }

        let position = self.position.ok_or_else(|| {
            CheckpointError::InvalidState(format!(
                "no event position to checkpoint for partition {}",
                self.partition
            ))
        })?;

        let checkpoint = Checkpoint::new(self.partition.as_ref().clone(), position);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CheckpointError::Cancelled),
            result = self.store.update_checkpoint(checkpoint, cancel) => result.map(|()| position),
        }
    }
}

#[async_trait]
impl CheckpointCommitter for PartitionCheckpointer {
    async fn commit(&self, cancel: &CancellationToken) -> Result<(), CheckpointError> {
        let consumer_group = self.partition.consumer_group();
        let partition_id = self.partition.partition_id();

        match self.write(cancel).await {
            Ok(position) => {
                debug!(
                    consumer_group = consumer_group,
                    partition_id = partition_id,
                    offset = position.offset(),
                    sequence_number = position.sequence_number(),
                    "Checkpoint committed"
                );
                metrics::counter!(
                    CHECKPOINTS_COMMITTED,
                    "consumer_group" => consumer_group.to_string(),
                    "partition" => partition_id.to_string()
                )
                .increment(1);
                Ok(())
            }
            Err(e) => {
                if e.is_cancelled() {
                    info!(
                        consumer_group = consumer_group,
                        partition_id = partition_id,
                        "Checkpoint commit cancelled"
                    );
                } else {
                    warn!(
                        consumer_group = consumer_group,
                        partition_id = partition_id,
                        position = ?self.position,
                        error = ?e,
                        "Checkpoint commit failed"
                    );
                }
                metrics::counter!(
                    CHECKPOINT_COMMIT_FAILURES,
                    "consumer_group" => consumer_group.to_string(),
                    "partition" => partition_id.to_string(),
                    "reason" => e.kind()
                )
                .increment(1);
                Err(e)
            }
        }
    }
}
