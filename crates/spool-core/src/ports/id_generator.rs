//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::EntryId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はエントリ ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数タスクから enqueue できる）
pub trait IdGenerator: Send + Sync {
    fn generate_entry_id(&self) -> EntryId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// ManualClock と組み合わせると timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_entry_id(&self) -> EntryId {
        let timestamp_ms = u64::try_from(self.clock.now_millis()).unwrap_or_default();
        EntryId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
