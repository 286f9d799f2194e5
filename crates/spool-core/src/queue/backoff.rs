//! Backoff policy: decides retry delays and when to give up.

use std::time::Duration;
use thiserror::Error;

/// Default delay table in milliseconds, indexed by retry attempt.
pub const DEFAULT_BACKOFF_MS: [u64; 5] = [0, 2_000, 4_000, 8_000, 16_000];

/// Default retry budget. Independent of the table length.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackoffError {
    #[error("backoff table must not be empty")]
    EmptyTable,

    #[error("backoff table must be non-decreasing (index {index} is smaller than its predecessor)")]
    Decreasing { index: usize },

    #[error("max_retries must be at least 1")]
    ZeroRetries,
}

/// Fixed lookup table of delays plus a retry budget.
///
/// Attempt `n` (0-indexed) waits `delays[n]`; anything past the end of the
/// table waits the last value. An entry whose `retry_count` reaches
/// `max_retries` is discarded regardless of the table length.
///
/// Example with the default table:
/// - attempt 0 (first try): 0ms
/// - attempt 1 (after one failure): 2s
/// - attempt 2: 4s
/// - attempt 3: 8s
/// - attempt 4 and later: 16s
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    delays: Vec<Duration>,
    max_retries: u32,
}

impl BackoffPolicy {
    pub fn new(delays: Vec<Duration>, max_retries: u32) -> Result<Self, BackoffError> {
        if delays.is_empty() {
            return Err(BackoffError::EmptyTable);
        }
        if let Some(index) = delays.windows(2).position(|w| w[1] < w[0]) {
            return Err(BackoffError::Decreasing { index: index + 1 });
        }
        if max_retries == 0 {
            return Err(BackoffError::ZeroRetries);
        }
        Ok(Self {
            delays,
            max_retries,
        })
    }

    pub fn from_millis(table: &[u64], max_retries: u32) -> Result<Self, BackoffError> {
        Self::new(
            table.iter().copied().map(Duration::from_millis).collect(),
            max_retries,
        )
    }

    /// Delay before attempt `attempt`, clamped to the last table entry.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = usize::try_from(attempt)
            .unwrap_or(usize::MAX)
            .min(self.delays.len() - 1);
        self.delays[index]
    }

    pub fn should_discard(&self, retry_count: u32) -> bool {
        retry_count >= self.max_retries
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            delays: DEFAULT_BACKOFF_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}
