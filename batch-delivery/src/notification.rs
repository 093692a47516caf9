//! Batch Delivery Notification - one receive outcome handed to a batch handler
//!
//! A notification is built by the partition loop right before each handler call
//! and dropped when the handler returns. It carries:
//! 1. The partition the batch came from
//! 2. The received events, or `None` when the receive attempt timed out
//! 3. A cancellation token the loop fires on shutdown or ownership loss
//! 4. A committer bound to this batch, the only side-effecting capability
//!
//! Nothing on a notification can be changed after construction.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::checkpoint::CheckpointCommitter;
use crate::error::{CheckpointError, NotificationError};
use crate::types::{EventRecord, PartitionContext};

pub struct BatchDeliveryNotification {
    partition: Option<Arc<PartitionContext>>,
    events: Option<Vec<EventRecord>>,
    cancellation: CancellationToken,
    committer: Arc<dyn CheckpointCommitter>,
}

impl BatchDeliveryNotification {
    /// Create a notification, copying `events` so the caller's buffer can be reused.
    ///
    /// A missing `cancellation` means the notification is never cancelled.
    pub fn new(
        partition: Option<Arc<PartitionContext>>,
        events: Option<&[EventRecord]>,
        committer: Arc<dyn CheckpointCommitter>,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        Self::from_batch(partition, events.map(<[EventRecord]>::to_vec), committer, cancellation)
    }

    /// Create a notification that takes ownership of an already received batch
    pub fn from_batch(
        partition: Option<Arc<PartitionContext>>,
        events: Option<Vec<EventRecord>>,
        committer: Arc<dyn CheckpointCommitter>,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        Self {
            partition,
            events,
            cancellation: cancellation.unwrap_or_else(CancellationToken::new),
            committer,
        }
    }

    pub fn builder() -> NotificationBuilder {
        NotificationBuilder::default()
    }

    /// True only when both the partition and the event list are present.
    /// A timed out receive (`events` is `None`) never has events.
    pub fn has_events(&self) -> bool {
        self.partition.is_some() && self.events.is_some()
    }

    pub fn partition(&self) -> Option<&PartitionContext> {
        self.partition.as_deref()
    }

    pub fn events(&self) -> Option<&[EventRecord]> {
        self.events.as_deref()
    }

    pub fn event_count(&self) -> usize {
        self.events.as_ref().map_or(0, Vec::len)
    }

    pub fn last_event(&self) -> Option<&EventRecord> {
        self.events.as_ref().and_then(|events| events.last())
    }

    /// Fired when the partition loop wants to stop. Handlers may ignore it, in
    /// which case the loop waits for them to return.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Record that every event up to and including this batch has been processed.
    ///
    /// Runs the bound committer with a token that is never cancelled. Committing
    /// a timed out delivery fails with `CheckpointError::InvalidState` when the
    /// committer needs an event position. Committing the same notification again
    /// re-sends the same checkpoint.
    pub async fn commit_checkpoint(&self) -> Result<(), CheckpointError> {
        self.committer.commit(&CancellationToken::new()).await
    }

    /// Same as `commit_checkpoint`, but hands `cancel` to the committer as is
    pub async fn commit_checkpoint_with(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), CheckpointError> {
        self.committer.commit(cancel).await
    }
}

impl fmt::Debug for BatchDeliveryNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchDeliveryNotification")
            .field("partition", &self.partition)
            .field("event_count", &self.events.as_ref().map(Vec::len))
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Builder for call sites where the committer is only known conditionally.
///
/// `build` refuses to produce a notification without a committer.
#[derive(Default)]
pub struct NotificationBuilder {
    partition: Option<Arc<PartitionContext>>,
    events: Option<Vec<EventRecord>>,
    committer: Option<Arc<dyn CheckpointCommitter>>,
    cancellation: Option<CancellationToken>,
}

impl NotificationBuilder {
    pub fn partition(mut self, partition: Arc<PartitionContext>) -> Self {
        self.partition = Some(partition);
        self
    }

    /// Copies the given events into the notification
    pub fn events(mut self, events: &[EventRecord]) -> Self {
        self.events = Some(events.to_vec());
        self
    }

    pub fn committer(mut self, committer: Arc<dyn CheckpointCommitter>) -> Self {
        self.committer = Some(committer);
        self
    }

    pub fn cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    pub fn build(self) -> Result<BatchDeliveryNotification, NotificationError> {
        let committer = self.committer.ok_or(NotificationError::MissingCommitter)?;

        Ok(BatchDeliveryNotification::from_batch(
            self.partition,
            self.events,
            committer,
            self.cancellation,
        ))
    }
}
