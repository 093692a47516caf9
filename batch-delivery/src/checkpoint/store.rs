use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::CheckpointError;
use crate::types::{CheckpointPosition, PartitionContext};

/// The last successfully processed position within a partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    partition: PartitionContext,
    offset: i64,
    sequence_number: i64,
    updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(partition: PartitionContext, position: CheckpointPosition) -> Self {
        Self {
            partition,
            offset: position.offset(),
            sequence_number: position.sequence_number(),
            updated_at: Utc::now(),
        }
    }

    pub fn partition(&self) -> &PartitionContext {
        &self.partition
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn position(&self) -> CheckpointPosition {
        CheckpointPosition::new(self.offset, self.sequence_number)
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Durable home for checkpoints, implemented outside this crate for real deployments
///
/// Implementations own retry policy, serialization of concurrent writers for the
/// same partition, and the on-disk format. They must stop before starting new I/O
/// once `cancel` fires and report it as `CheckpointError::Cancelled`.
///
/// An update at or behind the stored position must succeed without moving the
/// checkpoint, so committing the same batch twice is harmless.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn update_checkpoint(
        &self,
        checkpoint: Checkpoint,
        cancel: &CancellationToken,
    ) -> Result<(), CheckpointError>;

    async fn get_checkpoint(
        &self,
        partition: &PartitionContext,
    ) -> Result<Option<Checkpoint>, CheckpointError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_serializes_position() {
        let partition = PartitionContext::new("ns", "orders", "$Default", "0");
        let checkpoint = Checkpoint::new(partition.clone(), CheckpointPosition::new(4096, 12));

        let json = serde_json::to_value(&checkpoint).unwrap();
        assert_eq!(json["offset"], 4096);
        assert_eq!(json["sequence_number"], 12);
        assert_eq!(json["partition"]["partition_id"], "0");

        let restored: Checkpoint = serde_json::from_value(json).unwrap();
        assert_eq!(restored, checkpoint);
        assert_eq!(restored.partition(), &partition);
    }
}
