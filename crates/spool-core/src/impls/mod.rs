//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryStorage**: 開発用・テスト用のストレージ
//! - **FileStorage**: JSON ファイルによる永続化
//! - **AlwaysOnline / WatchReachability**: 到達性シグナル
//! - **NoopNotifier / LogNotifier**: 通知シンク
//!
//! Sender の本番実装（HTTP クライアントなど）はアプリ側で用意します。

pub mod file_storage;
pub mod memory_storage;
pub mod notifier;
pub mod reachability;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型を再エクスポート
pub use self::file_storage::FileStorage;
pub use self::memory_storage::InMemoryStorage;
pub use self::notifier::{LogNotifier, NoopNotifier};
pub use self::reachability::{AlwaysOnline, WatchReachability};
