//! Reachability 実装
//!
//! - **AlwaysOnline**: 到達性を監視しない環境向け（通知なし）
//! - **WatchReachability**: OS の接続状態を `set_online()` で流し込む

use tokio::sync::watch;

use crate::ports::Reachability;

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOnline;

impl Reachability for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

/// WatchReachability は tokio の watch チャネルで状態を共有
#[derive(Debug)]
pub struct WatchReachability {
    tx: watch::Sender<bool>,
}

impl WatchReachability {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// 状態が変わったときだけ購読者に通知する
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
    }
}

impl Reachability for WatchReachability {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn watch(&self) -> Option<watch::Receiver<bool>> {
        Some(self.tx.subscribe())
    }
}
