//! Events - 同期ステータスの通知内容

use serde::{Deserialize, Serialize};

/// Lifecycle of a drain as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Syncing,
    Synced,
    /// At least one entry was discarded after exhausting its retries.
    Failed,
}

/// One broadcast: `status` plus progress through the current drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUpdate {
    pub status: SyncStatus,
    pub completed: usize,
    pub total: usize,
}

impl SyncUpdate {
    pub fn syncing(completed: usize, total: usize) -> Self {
        Self {
            status: SyncStatus::Syncing,
            completed,
            total,
        }
    }

    pub fn synced(completed: usize, total: usize) -> Self {
        Self {
            status: SyncStatus::Synced,
            completed,
            total,
        }
    }

    pub fn failed(completed: usize, total: usize) -> Self {
        Self {
            status: SyncStatus::Failed,
            completed,
            total,
        }
    }
}
