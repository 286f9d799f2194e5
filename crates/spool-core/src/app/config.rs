//! QueueConfig - キューごとの設定
//!
//! JSON から読み込めます（省略したフィールドはデフォルト値）。
//! 2 つの既知の用途にはプリセットがあります:
//! - `offline_mutations()`: オフライン中のユーザー操作を 1 件ずつ再送
//! - `log_shipping()`: ログイベントをバッチでログ集約エンドポイントへ送信

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::{BackoffError, BackoffPolicy, DEFAULT_BACKOFF_MS, DEFAULT_MAX_RETRIES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid backoff: {0}")]
    Backoff(#[from] BackoffError),
}

/// How a drain hands entries to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Head entry only; a failure blocks later entries until it resolves.
    #[default]
    Single,
    /// Every entry present when the drain starts, as one batch.
    Batch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Used in logs and stats.
    pub name: String,
    pub storage_key: String,
    /// A disabled queue rejects enqueue and never drains.
    pub enabled: bool,
    pub mode: DeliveryMode,
    pub flush_interval_ms: u64,
    /// Drain as soon as this many entries are pending.
    pub max_queue_size: usize,
    /// Drain as soon as the pending payloads reach this many bytes.
    pub max_byte_size: usize,
    pub max_retries: u32,
    pub backoff_ms: Vec<u64>,
    /// Show `offline_message` for every enqueue made while offline.
    pub notify_offline: bool,
    pub offline_message: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "spool".to_string(),
            storage_key: "spool_queue".to_string(),
            enabled: true,
            mode: DeliveryMode::Single,
            flush_interval_ms: 30_000,
            max_queue_size: 100,
            max_byte_size: 256 * 1024,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_ms: DEFAULT_BACKOFF_MS.to_vec(),
            notify_offline: false,
            offline_message: "Saved offline. Will sync when back online.".to_string(),
        }
    }
}

impl QueueConfig {
    /// User actions taken while disconnected; flushed on every enqueue.
    pub fn offline_mutations() -> Self {
        Self {
            name: "offline-mutations".to_string(),
            storage_key: "offline_mutation_queue".to_string(),
            mode: DeliveryMode::Single,
            flush_interval_ms: 30_000,
            max_queue_size: 1,
            max_byte_size: 1024 * 1024,
            notify_offline: true,
            ..Self::default()
        }
    }

    /// Telemetry events pushed to the log-aggregation endpoint in batches.
    pub fn log_shipping() -> Self {
        Self {
            name: "log-shipping".to_string(),
            storage_key: "log_shipping_queue".to_string(),
            mode: DeliveryMode::Batch,
            flush_interval_ms: 5_000,
            max_queue_size: 50,
            max_byte_size: 64 * 1024,
            notify_offline: false,
            ..Self::default()
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".to_string()));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty".to_string()));
        }
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::Invalid("flush_interval_ms must be positive".to_string()));
        }
        if self.max_queue_size == 0 {
            return Err(ConfigError::Invalid("max_queue_size must be positive".to_string()));
        }
        if self.max_byte_size == 0 {
            return Err(ConfigError::Invalid("max_byte_size must be positive".to_string()));
        }
        self.backoff_policy()?;
        Ok(())
    }

    pub fn backoff_policy(&self) -> Result<BackoffPolicy, ConfigError> {
        Ok(BackoffPolicy::from_millis(&self.backoff_ms, self.max_retries)?)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}
