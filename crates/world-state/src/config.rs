use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the
/// [`WorldStateSynchronizer`](crate::WorldStateSynchronizer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldStateConfig {
    /// How often the synchronizer checks for newly downloaded blocks.
    pub block_check_interval: Duration,
    /// Capacity of the downloaded block queue. The downloader stalls once
    /// the queue is full, which bounds how far it can run ahead of block
    /// application.
    pub block_queue_capacity: usize,
}

impl Default for WorldStateConfig {
    fn default() -> Self {
        Self { block_check_interval: Duration::from_millis(100), block_queue_capacity: 1000 }
    }
}
