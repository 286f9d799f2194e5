//! Notifier 実装

use tracing::info;

use crate::ports::Notifier;

/// 何もしない（ログ配送キューなど、UI 通知が不要な場合）
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _message: &str) {}
}

/// UI がない環境（CLI・デーモン）ではトーストの代わりにログに出す
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        info!(target: "spool::notify", "{message}");
    }
}
