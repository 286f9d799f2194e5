//! Reachability port - ネットワーク到達性
//!
//! 到達性は drain を止めません（送信失敗と backoff に任せる）。
//! 使い道は次の 2 つだけです:
//! - enqueue 時に「オフライン保存しました」通知を出すかどうか
//! - 復帰（offline → online）を検知したら flush を要求する

use tokio::sync::watch;

/// Reachability は接続状態を提供
pub trait Reachability: Send + Sync {
    fn is_online(&self) -> bool;

    /// 変更通知のストリーム。通知できない実装は `None` を返す。
    fn watch(&self) -> Option<watch::Receiver<bool>> {
        None
    }
}
