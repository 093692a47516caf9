use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one partition of an event stream as seen by one consumer group.
///
/// Owned by whoever runs the receive loop. Notifications and checkpointers only
/// hold shared references to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionContext {
    fully_qualified_namespace: String,
    event_stream_name: String,
    consumer_group: String,
    partition_id: String,
}

impl PartitionContext {
    pub fn new(
        fully_qualified_namespace: impl Into<String>,
        event_stream_name: impl Into<String>,
        consumer_group: impl Into<String>,
        partition_id: impl Into<String>,
    ) -> Self {
        Self {
            fully_qualified_namespace: fully_qualified_namespace.into(),
            event_stream_name: event_stream_name.into(),
            consumer_group: consumer_group.into(),
            partition_id: partition_id.into(),
        }
    }

    pub fn fully_qualified_namespace(&self) -> &str {
        &self.fully_qualified_namespace
    }

    pub fn event_stream_name(&self) -> &str {
        &self.event_stream_name
    }

    pub fn consumer_group(&self) -> &str {
        &self.consumer_group
    }

    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }
}

impl fmt::Display for PartitionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}:{}",
            self.fully_qualified_namespace,
            self.event_stream_name,
            self.consumer_group,
            self.partition_id
        )
    }
}

/// Position of an event within its partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckpointPosition {
    offset: i64,
    sequence_number: i64,
}

impl CheckpointPosition {
    pub fn new(offset: i64, sequence_number: i64) -> Self {
        Self {
            offset,
            sequence_number,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }
}

/// A single event read from a partition: opaque body plus broker metadata
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    body: Bytes,
    offset: i64,
    sequence_number: i64,
    enqueued_time: DateTime<Utc>,

    /// Key the producer used to route the event, if any
    pub partition_key: Option<String>,

    /// Application properties attached by the producer
    pub properties: HashMap<String, String>,
}

impl EventRecord {
    pub fn new(
        body: impl Into<Bytes>,
        offset: i64,
        sequence_number: i64,
        enqueued_time: DateTime<Utc>,
    ) -> Self {
        Self {
            body: body.into(),
            offset,
            sequence_number,
            enqueued_time,
            partition_key: None,
            properties: HashMap::new(),
        }
    }

    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the body as a UTF-8 string if possible
    pub fn body_as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    pub fn enqueued_time(&self) -> DateTime<Utc> {
        self.enqueued_time
    }

    pub fn position(&self) -> CheckpointPosition {
        CheckpointPosition::new(self.offset, self.sequence_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_context_display() {
        let partition = PartitionContext::new("ns.example.net", "orders", "$Default", "3");

        assert_eq!(partition.to_string(), "ns.example.net/orders/$Default:3");
        assert_eq!(partition.partition_id(), "3");
        assert_eq!(partition.consumer_group(), "$Default");
    }

    #[test]
    fn test_event_record_accessors() {
        let enqueued = Utc::now();
        let event = EventRecord::new(&b"hello"[..], 1024, 7, enqueued)
            .with_partition_key("user-1")
            .with_property("content-type", "text/plain");

        assert_eq!(event.body_as_str().unwrap(), "hello");
        assert_eq!(event.offset(), 1024);
        assert_eq!(event.sequence_number(), 7);
        assert_eq!(event.enqueued_time(), enqueued);
        assert_eq!(event.partition_key.as_deref(), Some("user-1"));
        assert_eq!(
            event.properties.get("content-type").map(String::as_str),
            Some("text/plain")
        );
        assert_eq!(event.position(), CheckpointPosition::new(1024, 7));
    }

    #[test]
    fn test_body_as_str_rejects_invalid_utf8() {
        let event = EventRecord::new(vec![0xff, 0xfe], 0, 0, Utc::now());
        assert!(event.body_as_str().is_err());
    }
}
