use thiserror::Error;

/// Errors raised while assembling a notification
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotificationError {
    /// Every notification must be able to checkpoint; there is no deferred failure
    #[error("a checkpoint committer is required to build a batch delivery notification")]
    MissingCommitter,
}

/// Errors that can occur when committing a checkpoint
///
/// Store failures are carried as `anyhow::Error` so the original cause chain
/// reaches the handler untouched. Log them with `error = ?e` or `{e:#}`.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// The commit observed a cancellation request before or during the write
    #[error("checkpoint commit cancelled")]
    Cancelled,

    /// The commit has nothing to record, e.g. the receive attempt timed out
    #[error("invalid checkpoint state: {0}")]
    InvalidState(String),

    /// The partition is no longer owned by this consumer
    #[error("ownership of partition {partition_id} in consumer group {consumer_group} was lost")]
    OwnershipLost {
        consumer_group: String,
        partition_id: String,
    },

    #[error("checkpoint store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl CheckpointError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CheckpointError::Cancelled)
    }

    /// Label used when counting commit outcomes
    pub fn kind(&self) -> &'static str {
        match self {
            CheckpointError::Cancelled => "cancelled",
            CheckpointError::InvalidState(_) => "invalid_state",
            CheckpointError::OwnershipLost { .. } => "ownership_lost",
            CheckpointError::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_cancelled_is_distinguishable() {
        assert!(CheckpointError::Cancelled.is_cancelled());
        assert!(!CheckpointError::InvalidState("no events".to_string()).is_cancelled());
        assert!(!CheckpointError::Store(anyhow::anyhow!("disk full")).is_cancelled());
    }

    #[test]
    fn test_store_error_keeps_cause_chain() {
        let root: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "connection reset",
        ));
        let err: CheckpointError = root
            .context("writing checkpoint blob")
            .unwrap_err()
            .into();

        assert_eq!(err.kind(), "store");
        let rendered = err.to_string();
        assert!(rendered.contains("writing checkpoint blob"));
        assert!(rendered.contains("connection reset"));
    }

    #[test]
    fn test_ownership_lost_message() {
        let err = CheckpointError::OwnershipLost {
            consumer_group: "$Default".to_string(),
            partition_id: "4".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ownership of partition 4 in consumer group $Default was lost"
        );
    }
}
