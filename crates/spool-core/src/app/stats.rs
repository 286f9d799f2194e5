use serde::{Deserialize, Serialize};

/// Point-in-time view of one queue, for dashboards and debug screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub name: String,
    pub enabled: bool,
    pub queue_length: usize,
    pub estimated_byte_size: usize,
    pub max_queue_size: usize,
    pub max_byte_size: usize,
    pub max_retries: u32,
    pub flush_interval_ms: u64,
    /// Retry count of the entries currently waiting on backoff (0 when healthy).
    pub current_retry_count: u32,
    /// `idle`, `draining` or `scheduled`.
    pub phase: String,
    pub retry_at_millis: Option<i64>,
    pub destroyed: bool,
}
