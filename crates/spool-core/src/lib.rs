//! spool-core
//!
//! Durable batched delivery queue: work is persisted on enqueue, delivered in
//! FIFO order by a pluggable sender, and retried with backoff until it
//! succeeds or exhausts its retry budget.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, entry, errors, events）
//! - **ports**: 抽象化レイヤー（Sender, Storage, Clock, Reachability, Notifier, IdGenerator）
//! - **queue**: キュー本体（arena, codec, store, backoff, drain phase）
//! - **app**: エンジン・ビルダー・ドライバー・設定
//! - **impls**: 実装（InMemoryStorage, FileStorage, WatchReachability など）

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{
    DeliveryDriver, DeliveryMode, DeliveryQueue, DeliveryQueueBuilder, DrainOutcome, QueueConfig,
    QueueStats, Subscription, TriggerReason,
};
pub use domain::{EntryId, EntryKind, LogLevel, MutationKind, QueueEntry, SendFailure, SyncStatus, SyncUpdate};
pub use error::SpoolError;
