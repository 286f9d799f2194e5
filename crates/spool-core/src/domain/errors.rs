//! Errors - 配送失敗の表現と分類
//!
//! 失敗理由はログ出力にだけ使い、リトライ判定には使いません
//! （429 も 5xx も同じ backoff で再送する）。

use thiserror::Error;

/// ErrorKind は配送失敗の分類
///
/// - Network: 応答なし（接続失敗・タイムアウト）
/// - RateLimited: 429
/// - Server: 5xx
/// - Rejected: その他の non-2xx
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    RateLimited,
    Server,
    Rejected,
}

/// A failed call to the remote side. Every variant is retried the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("send failed (status={status_code:?}): {message}")]
pub struct SendFailure {
    pub status_code: Option<u16>,
    pub message: String,
}

impl SendFailure {
    /// No response at all.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
        }
    }

    /// The remote answered with a non-success status.
    pub fn status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.status_code {
            None => ErrorKind::Network,
            Some(429) => ErrorKind::RateLimited,
            Some(code) if code >= 500 => ErrorKind::Server,
            Some(_) => ErrorKind::Rejected,
        }
    }
}
