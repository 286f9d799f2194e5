//! Notifier port - UI のトースト通知

/// Notifier は fire-and-forget の一時メッセージ表示
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}
