//! Sender port - リモート API / ログ集約エンドポイントへの送信
//!
//! 単発送信（オフライン mutation）もバッチ送信（ログ）も
//! 「エントリのスライスを送る」という同じ形で扱います。
//! 単発モードではスライスの長さは常に 1 です。

use async_trait::async_trait;

use crate::domain::{QueueEntry, SendFailure};

/// Sender は外部への配送能力
///
/// # 契約
/// - `Ok(())` は 2xx / no-content
/// - それ以外はすべて `SendFailure`（失敗理由で特別扱いはしない）
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, batch: &[QueueEntry]) -> Result<(), SendFailure>;
}
