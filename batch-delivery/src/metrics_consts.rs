// ==== Delivery metrics ====
/// Counter for notifications handed to a batch handler
pub const NOTIFICATIONS_DELIVERED: &str = "batch_delivery_notifications_delivered_total";

/// Counter for events carried by delivered notifications
pub const EVENTS_DELIVERED: &str = "batch_delivery_events_delivered_total";

/// Counter for handler invocations that returned an error
pub const HANDLER_ERRORS: &str = "batch_delivery_handler_errors_total";

/// Histogram for handler invocation time
pub const HANDLER_DURATION: &str = "batch_delivery_handler_duration_seconds";

// ==== Checkpoint metrics ====
/// Counter for checkpoints durably committed
pub const CHECKPOINTS_COMMITTED: &str = "batch_delivery_checkpoints_committed_total";

/// Counter for failed checkpoint commits, labelled by error kind
pub const CHECKPOINT_COMMIT_FAILURES: &str = "batch_delivery_checkpoint_commit_failures_total";

/// Counter for updates a store accepted without moving the checkpoint
pub const CHECKPOINT_STALE_UPDATES: &str = "batch_delivery_checkpoint_stale_updates_total";
