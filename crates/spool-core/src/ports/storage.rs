//! Storage port - 永続化キーバリューストア
//!
//! キュー全体をシリアライズした文字列を 1 キーに保存します。
//! すべての呼び出しは失敗しうるが、呼び出し側（QueueStore）がログに残して握りつぶします。

use async_trait::async_trait;
use thiserror::Error;

/// StorageError は永続化層のエラー
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Storage は durable なキーバリューストア
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
