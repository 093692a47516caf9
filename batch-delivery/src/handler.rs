use anyhow::Result;
use async_trait::async_trait;

use crate::notification::BatchDeliveryNotification;

/// User code that processes one delivery per receive cycle
///
/// The handler owns the notification for the whole call and may commit a
/// checkpoint before returning. Returning (with or without an error) tells the
/// partition loop that the cycle is over; the loop never runs two handler calls
/// for the same partition at once.
#[async_trait]
pub trait BatchHandler: Send + Sync {
    async fn handle(&self, notification: BatchDeliveryNotification) -> Result<()>;
}
