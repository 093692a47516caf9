pub mod committer;
pub mod memory;
pub mod store;

pub use committer::{CheckpointCommitter, PartitionCheckpointer};
pub use memory::MemoryCheckpointStore;
pub use store::{Checkpoint, CheckpointStore};
