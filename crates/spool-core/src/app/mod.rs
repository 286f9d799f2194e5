//! App - アプリケーション層
//!
//! ports を組み合わせて配送キューを組み立てます。
//!
//! # 主要コンポーネント
//! - **DeliveryQueueBuilder**: 設定とポートのワイヤリング（Fail-fast 検証）
//! - **DeliveryQueue**: enqueue / drain / retry / destroy のエンジン
//! - **DeliveryDriver**: flush 間隔・retry タイマー・到達性変化を tokio で駆動
//! - **StatusBroadcaster**: 同期状態の購読
//! - **QueueConfig / QueueStats**: 設定と状態のスナップショット

pub mod builder;
pub mod config;
pub mod driver;
pub mod engine;
pub mod stats;
pub mod status;


// 主要な型を再エクスポート
pub use self::builder::{BuildError, DeliveryQueueBuilder};
pub use self::config::{ConfigError, DeliveryMode, QueueConfig};
pub use self::driver::DeliveryDriver;
pub use self::engine::{DeliveryQueue, DrainOutcome, TriggerReason};
pub use self::stats::QueueStats;
pub use self::status::{StatusBroadcaster, StatusListener, Subscription};
