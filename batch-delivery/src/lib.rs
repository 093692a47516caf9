//! Batch delivery for partitioned event streams.
//!
//! A partition loop receives batches from a stream and hands each one to a
//! [`BatchHandler`] as a [`BatchDeliveryNotification`]. The notification carries
//! the events (or nothing, when the receive timed out), a cancellation token and
//! a [`CheckpointCommitter`] bound to the batch, so the handler decides when
//! progress is durable.
//!
//! ## Error logging (anyhow)
//!
//! When logging `anyhow::Error` or `CheckpointError::Store`, use formats that
//! include the full chain so root causes are visible in logs:
//!
//! - **Inline format:** `{e:#}` gives the full chain on one line (`outer: middle: root cause`).
//! - **Structured field:** `error = ?e` gives the full chain with `Caused by:` sections (Debug).
//!
//! Avoid `{}` / `%e` (Display) on its own for errors, it only shows the top-level message.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod handler;
pub mod metrics_consts;
pub mod notification;
pub mod partition_worker;
pub mod types;

// Used in "mod tests" and tests/ directory (integration tests)
pub mod test_utils;

// Public API
pub use checkpoint::{
    Checkpoint, CheckpointCommitter, CheckpointStore, MemoryCheckpointStore,
    PartitionCheckpointer,
};
pub use error::{CheckpointError, NotificationError};
pub use handler::BatchHandler;
pub use notification::{BatchDeliveryNotification, NotificationBuilder};
pub use partition_worker::{PartitionWorker, PartitionWorkerConfig, ReceivedBatch};
pub use types::{CheckpointPosition, EventRecord, PartitionContext};
