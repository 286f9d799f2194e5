//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! キュー本体は外部システム（リモート API、端末のストレージ、
//! 到達性シグナル、UI 通知）をこれらの trait 越しにしか知りません。

pub mod clock;
pub mod id_generator;
pub mod notifier;
pub mod reachability;
pub mod sender;
pub mod storage;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notifier::Notifier;
pub use self::reachability::Reachability;
pub use self::sender::Sender;
pub use self::storage::{Storage, StorageError};
