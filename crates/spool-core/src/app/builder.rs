//! DeliveryQueueBuilder - キューの構築とワイヤリング
//!
//! # 方針
//! - 起動時検証（Fail-fast）: 設定不正や必須ポート欠落は `build()` で `BuildError`
//! - 任意のポートは既定値で埋める（SystemClock / UlidGenerator / AlwaysOnline / LogNotifier）

use std::sync::Arc;

use super::config::{ConfigError, QueueConfig};
use super::engine::{Collaborators, DeliveryQueue};
use crate::impls::{AlwaysOnline, LogNotifier};
use crate::ports::{
    Clock, IdGenerator, Notifier, Reachability, Sender, Storage, SystemClock, UlidGenerator,
};

/// Builds a [`DeliveryQueue`] from a config plus its ports.
///
/// # 使用例
/// ```ignore
/// let queue = DeliveryQueueBuilder::new(QueueConfig::log_shipping())
///     .sender(Arc::new(HttpLogSender::new(endpoint)))
///     .storage(Arc::new(FileStorage::new("./spool")))
///     .build()?;
/// ```
pub struct DeliveryQueueBuilder {
    config: QueueConfig,
    sender: Option<Arc<dyn Sender>>,
    storage: Option<Arc<dyn Storage>>,
    reachability: Option<Arc<dyn Reachability>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はキュー構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("queue `{0}` has no sender. Call .sender(..) before build().")]
    MissingSender(String),

    #[error("queue `{0}` has no storage. Call .storage(..) before build().")]
    MissingStorage(String),

    #[error("invalid queue config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl DeliveryQueueBuilder {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            sender: None,
            storage: None,
            reachability: None,
            notifier: None,
            clock: None,
            ids: None,
        }
    }

    pub fn sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn reachability(mut self, reachability: Arc<dyn Reachability>) -> Self {
        self.reachability = Some(reachability);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Also drives id generation unless `.id_generator(..)` is given.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// # 検証
    /// - `QueueConfig::validate()` と backoff テーブル
    /// - sender / storage が設定されていること
    pub fn build(self) -> Result<DeliveryQueue, BuildError> {
        self.config.validate()?;
        let backoff = self.config.backoff_policy()?;

        let sender = self
            .sender
            .ok_or_else(|| BuildError::MissingSender(self.config.name.clone()))?;
        let storage = self
            .storage
            .ok_or_else(|| BuildError::MissingStorage(self.config.name.clone()))?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))) as Arc<dyn IdGenerator>);

        let parts = Collaborators {
            sender,
            storage,
            reachability: self
                .reachability
                .unwrap_or_else(|| Arc::new(AlwaysOnline) as Arc<dyn Reachability>),
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(LogNotifier) as Arc<dyn Notifier>),
            clock,
            ids,
        };
        Ok(DeliveryQueue::new(self.config, backoff, parts))
    }
}
