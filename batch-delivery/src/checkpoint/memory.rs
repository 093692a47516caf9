use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::checkpoint::store::{Checkpoint, CheckpointStore};
use crate::error::CheckpointError;
use crate::metrics_consts::CHECKPOINT_STALE_UPDATES;
use crate::types::PartitionContext;

/// In-process checkpoint store
///
/// Checkpoints only move forward (by sequence number). Partitions can be fenced to
/// simulate ownership moving to another consumer; fenced partitions reject writes.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    checkpoints: DashMap<PartitionContext, Checkpoint>,
    fenced: DashSet<PartitionContext>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject further writes for this partition until `unfence` is called
    pub fn fence(&self, partition: &PartitionContext) {
        if self.fenced.insert(partition.clone()) {
            info!(
                consumer_group = partition.consumer_group(),
                partition_id = partition.partition_id(),
                "Fenced partition in checkpoint store"
            );
        }
    }

    pub fn unfence(&self, partition: &PartitionContext) {
        self.fenced.remove(partition);
    }

    pub fn is_fenced(&self, partition: &PartitionContext) -> bool {
        self.fenced.contains(partition)
    }

    /// Snapshot of every stored checkpoint
    pub fn list_checkpoints(&self) -> Vec<Checkpoint> {
        self.checkpoints
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn update_checkpoint(
        &self,
        checkpoint: Checkpoint,
        cancel: &CancellationToken,
    ) -> Result<(), CheckpointError> {
        if cancel.is_cancelled() {
            return Err(CheckpointError::Cancelled);
        }

        let partition = checkpoint.partition();
        if self.fenced.contains(partition) {
            return Err(CheckpointError::OwnershipLost {
                consumer_group: partition.consumer_group().to_string(),
                partition_id: partition.partition_id().to_string(),
            });
        }

        match self.checkpoints.entry(partition.clone()) {
            Entry::Occupied(mut entry) => {
                let current = entry.get().sequence_number();
                if checkpoint.sequence_number() <= current {
                    debug!(
                        consumer_group = partition.consumer_group(),
                        partition_id = partition.partition_id(),
                        current_sequence_number = current,
                        requested_sequence_number = checkpoint.sequence_number(),
                        "Checkpoint update at or behind stored position - keeping stored checkpoint"
                    );
                    metrics::counter!(
                        CHECKPOINT_STALE_UPDATES,
                        "consumer_group" => partition.consumer_group().to_string(),
                        "partition" => partition.partition_id().to_string()
                    )
                    .increment(1);
                    return Ok(());
                }

                debug!(
                    consumer_group = partition.consumer_group(),
                    partition_id = partition.partition_id(),
                    previous_sequence_number = current,
                    new_sequence_number = checkpoint.sequence_number(),
                    "Advancing checkpoint"
                );
                entry.insert(checkpoint);
            }
            Entry::Vacant(entry) => {
                debug!(
                    consumer_group = partition.consumer_group(),
                    partition_id = partition.partition_id(),
                    sequence_number = checkpoint.sequence_number(),
                    "Initializing checkpoint"
                );
                entry.insert(checkpoint);
            }
        }

        Ok(())
    }

    async fn get_checkpoint(
        &self,
        partition: &PartitionContext,
    ) -> Result<Option<Checkpoint>, CheckpointError> {
        Ok(self
            .checkpoints
            .get(partition)
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckpointPosition;

    fn test_partition(id: &str) -> PartitionContext {
        PartitionContext::new("ns", "orders", "$Default", id)
    }

    fn checkpoint_at(partition: &PartitionContext, sequence_number: i64) -> Checkpoint {
        Checkpoint::new(
            partition.clone(),
            CheckpointPosition::new(sequence_number * 100, sequence_number),
        )
    }

    #[tokio::test]
    async fn test_update_initializes_checkpoint() {
        let store = MemoryCheckpointStore::new();
        let partition = test_partition("0");

        store
            .update_checkpoint(checkpoint_at(&partition, 5), &CancellationToken::new())
            .await
            .unwrap();

        let stored = store.get_checkpoint(&partition).await.unwrap().unwrap();
        assert_eq!(stored.sequence_number(), 5);
        assert_eq!(stored.offset(), 500);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_update_never_goes_backwards() {
        let store = MemoryCheckpointStore::new();
        let partition = test_partition("0");
        let cancel = CancellationToken::new();

        store
            .update_checkpoint(checkpoint_at(&partition, 10), &cancel)
            .await
            .unwrap();
        store
            .update_checkpoint(checkpoint_at(&partition, 4), &cancel)
            .await
            .unwrap();

        let stored = store.get_checkpoint(&partition).await.unwrap().unwrap();
        assert_eq!(stored.sequence_number(), 10);
    }

    #[tokio::test]
    async fn test_repeated_update_is_a_no_op() {
        let store = MemoryCheckpointStore::new();
        let partition = test_partition("0");
        let cancel = CancellationToken::new();
        let checkpoint = checkpoint_at(&partition, 3);

        store
            .update_checkpoint(checkpoint.clone(), &cancel)
            .await
            .unwrap();
        store.update_checkpoint(checkpoint, &cancel).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store
                .get_checkpoint(&partition)
                .await
                .unwrap()
                .unwrap()
                .sequence_number(),
            3
        );
    }

    #[tokio::test]
    async fn test_cancelled_update_does_not_write() {
        let store = MemoryCheckpointStore::new();
        let partition = test_partition("0");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = store
            .update_checkpoint(checkpoint_at(&partition, 1), &cancel)
            .await;

        assert!(matches!(result, Err(CheckpointError::Cancelled)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_fenced_partition_rejects_updates() {
        let store = MemoryCheckpointStore::new();
        let p0 = test_partition("0");
        let p1 = test_partition("1");
        let cancel = CancellationToken::new();

        store.fence(&p0);
        assert!(store.is_fenced(&p0));

        let result = store.update_checkpoint(checkpoint_at(&p0, 1), &cancel).await;
        match result {
            Err(CheckpointError::OwnershipLost {
                consumer_group,
                partition_id,
            }) => {
                assert_eq!(consumer_group, "$Default");
                assert_eq!(partition_id, "0");
            }
            other => panic!("expected OwnershipLost, got {other:?}"),
        }

        // Other partitions are unaffected
        store
            .update_checkpoint(checkpoint_at(&p1, 1), &cancel)
            .await
            .unwrap();

        store.unfence(&p0);
        store
            .update_checkpoint(checkpoint_at(&p0, 1), &cancel)
            .await
            .unwrap();
        assert_eq!(store.list_checkpoints().len(), 2);
    }

    #[tokio::test]
    async fn test_get_unknown_partition_returns_none() {
        let store = MemoryCheckpointStore::new();
        assert!(store
            .get_checkpoint(&test_partition("9"))
            .await
            .unwrap()
            .is_none());
    }
}
