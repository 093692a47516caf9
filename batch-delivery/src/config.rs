use envconfig::Envconfig;

use crate::partition_worker::PartitionWorkerConfig;
use crate::types::PartitionContext;

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    // Event stream identity
    #[envconfig(default = "localhost")]
    pub fully_qualified_namespace: String,

    #[envconfig(default = "events")]
    pub event_stream_name: String,

    #[envconfig(default = "$Default")]
    pub consumer_group: String,

    // Partition worker configuration
    #[envconfig(default = "10")]
    pub partition_channel_buffer_size: usize,
}

impl Config {
    pub fn init_with_defaults() -> Result<Self, envconfig::Error> {
        Config::init_from_env()
    }

    /// Build the context for one partition of the configured stream
    pub fn partition_context(&self, partition_id: impl Into<String>) -> PartitionContext {
        PartitionContext::new(
            self.fully_qualified_namespace.clone(),
            self.event_stream_name.clone(),
            self.consumer_group.clone(),
            partition_id,
        )
    }

    /// Worker settings; the channel needs room for at least one batch
    pub fn partition_worker_config(&self) -> PartitionWorkerConfig {
        PartitionWorkerConfig {
            channel_buffer_size: self.partition_channel_buffer_size.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();

        assert_eq!(config.fully_qualified_namespace, "localhost");
        assert_eq!(config.event_stream_name, "events");
        assert_eq!(config.consumer_group, "$Default");
        assert_eq!(config.partition_worker_config().channel_buffer_size, 10);
    }

    #[test]
    fn test_overrides_and_partition_context() {
        let env = HashMap::from([
            (
                "FULLY_QUALIFIED_NAMESPACE".to_string(),
                "ns.example.net".to_string(),
            ),
            ("EVENT_STREAM_NAME".to_string(), "orders".to_string()),
            ("CONSUMER_GROUP".to_string(), "billing".to_string()),
            ("PARTITION_CHANNEL_BUFFER_SIZE".to_string(), "2".to_string()),
        ]);
        let config = Config::init_from_hashmap(&env).unwrap();

        let partition = config.partition_context("7");
        assert_eq!(partition.fully_qualified_namespace(), "ns.example.net");
        assert_eq!(partition.event_stream_name(), "orders");
        assert_eq!(partition.consumer_group(), "billing");
        assert_eq!(partition.partition_id(), "7");
        assert_eq!(config.partition_worker_config().channel_buffer_size, 2);
    }

    #[test]
    fn test_zero_buffer_size_is_raised_to_one() {
        let env = HashMap::from([(
            "PARTITION_CHANNEL_BUFFER_SIZE".to_string(),
            "0".to_string(),
        )]);
        let config = Config::init_from_hashmap(&env).unwrap();

        assert_eq!(config.partition_worker_config().channel_buffer_size, 1);
    }

    #[test]
    fn test_invalid_buffer_size_is_rejected() {
        let env = HashMap::from([(
            "PARTITION_CHANNEL_BUFFER_SIZE".to_string(),
            "lots".to_string(),
        )]);

        assert!(Config::init_from_hashmap(&env).is_err());
    }
}
