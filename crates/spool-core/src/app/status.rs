//! Status - 同期ステータスの配信
//!
//! # 保証すること
//! - `emit()` は登録順に全 listener を同期的に呼ぶ
//! - listener の panic は個別に捕捉してログに残す（他の listener とエンジンには影響しない）
//! - listener の中から subscribe / unsubscribe してもデッドロックしない
//!   （呼び出しはロック外で行う）

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::warn;

use crate::domain::SyncUpdate;

/// Receives every status broadcast.
pub trait StatusListener: Send + Sync {
    fn on_status(&self, update: SyncUpdate);
}

impl<F> StatusListener for F
where
    F: Fn(SyncUpdate) + Send + Sync,
{
    fn on_status(&self, update: SyncUpdate) {
        self(update)
    }
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: Vec<(u64, Arc<dyn StatusListener>)>,
}

#[derive(Clone, Default)]
pub struct StatusBroadcaster {
    table: Arc<RwLock<ListenerTable>>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl StatusListener + 'static) -> Subscription {
        let mut table = self.table.write();
        let id = table.next_id;
        table.next_id += 1;
        table.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.table.read().listeners.len()
    }

    pub fn emit(&self, update: SyncUpdate) {
        let listeners: Vec<(u64, Arc<dyn StatusListener>)> = self.table.read().listeners.clone();
        for (id, listener) in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_status(update)));
            if outcome.is_err() {
                warn!(listener_id = id, ?update, "status listener panicked");
            }
        }
    }
}

/// Handle returned by [`StatusBroadcaster::subscribe`].
///
/// Dropping it keeps the listener registered; call `unsubscribe` to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    table: Weak<RwLock<ListenerTable>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns false if the listener was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(table) = self.table.upgrade() else {
            return false;
        };
        let mut table = table.write();
        let before = table.listeners.len();
        table.listeners.retain(|(id, _)| *id != self.id);
        table.listeners.len() != before
    }
}
