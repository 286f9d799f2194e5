//! Queue store: the arena plus its durable copy.
//!
//! Every mutation goes through [`QueueStore::mutate`], which applies the change
//! in memory and then writes the whole queue to storage. A failed write is
//! logged and swallowed: the in-memory queue stays authoritative for the
//! lifetime of the process.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::arena::{ArenaError, EntryArena};
use super::codec;
use crate::domain::{EntryId, EntryStatus, QueueEntry};
use crate::ports::Storage;

pub struct QueueStore {
    key: String,
    storage: Arc<dyn Storage>,
    arena: Mutex<EntryArena>,
    /// Set once the persisted queue has been read (holds the restored count).
    loaded: OnceCell<usize>,
    /// Serializes storage writes. Each write encodes the arena *after*
    /// acquiring the gate, so the last write always carries the newest state.
    write_gate: tokio::sync::Mutex<()>,
}

impl QueueStore {
    pub fn new(key: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self {
            key: key.into(),
            storage,
            arena: Mutex::new(EntryArena::new()),
            loaded: OnceCell::new(),
            write_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append and persist.
    pub async fn enqueue(&self, entry: QueueEntry) -> Result<(), ArenaError> {
        self.mutate(|arena| arena.push(entry)).await
    }

    pub async fn remove_by_id(&self, id: &EntryId) -> Option<QueueEntry> {
        self.mutate(|arena| arena.remove(id)).await
    }

    pub async fn remove_matching<F>(&self, predicate: F) -> Vec<QueueEntry>
    where
        F: FnMut(&QueueEntry) -> bool + Send,
    {
        self.mutate(|arena| arena.remove_matching(predicate)).await
    }

    /// Apply `f` to the arena, then persist.
    ///
    /// The arena lock is released before the storage write.
    pub async fn mutate<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut EntryArena) -> R + Send,
        R: Send,
    {
        self.restore().await;
        let result = {
            let mut arena = self.arena.lock();
            f(&mut arena)
        };
        self.write_snapshot().await;
        result
    }

    /// Runtime-only status change. Not persisted.
    pub fn mark(&self, ids: &[EntryId], status: EntryStatus) {
        let mut arena = self.arena.lock();
        for id in ids {
            arena.set_status(id, status);
        }
    }

    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.arena.lock().snapshot()
    }

    pub fn head(&self, n: usize) -> Vec<QueueEntry> {
        self.arena.lock().head(n)
    }

    pub fn get(&self, id: &EntryId) -> Option<QueueEntry> {
        self.arena.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.arena.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.lock().is_empty()
    }

    pub fn estimated_byte_size(&self) -> usize {
        self.arena.lock().estimated_byte_size()
    }

    /// Load the persisted queue into memory, once per store.
    ///
    /// Runs implicitly before the first mutation, so a write never replaces a
    /// previous process's queue before it was read. Later calls return the
    /// count from the first load. Missing, unreadable or corrupt data restores
    /// nothing. Returns the number of entries restored from storage.
    pub async fn restore(&self) -> usize {
        *self.loaded.get_or_init(|| self.load_persisted()).await
    }

    async fn load_persisted(&self) -> usize {
        let raw = match self.storage.load(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no persisted queue");
                return 0;
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to load persisted queue; starting empty");
                return 0;
            }
        };

        let restored = codec::decode_lenient(&raw);
        let (count, merged) = {
            let mut arena = self.arena.lock();
            let early = arena.snapshot();
            arena.clear();
            let mut count = 0;
            for entry in restored {
                if arena.push(entry).is_ok() {
                    count += 1;
                }
            }
            let merged = !early.is_empty();
            for entry in early {
                if let Err(err) = arena.push(entry) {
                    debug!(error = %err, "entry already restored from storage");
                }
            }
            (count, merged)
        };

        if merged {
            self.write_snapshot().await;
        }
        info!(key = %self.key, count, "restored persisted queue");
        count
    }

    /// Drop everything, in memory and on disk.
    pub async fn clear(&self) -> usize {
        self.restore().await;
        let dropped = self.arena.lock().clear();
        let _gate = self.write_gate.lock().await;
        if let Err(err) = self.storage.remove(&self.key).await {
            warn!(key = %self.key, error = %err, "failed to remove persisted queue");
        }
        dropped
    }

    /// Write the current queue. Returns whether the write succeeded.
    pub async fn persist(&self) -> bool {
        self.restore().await;
        self.write_snapshot().await
    }

    async fn write_snapshot(&self) -> bool {
        let _gate = self.write_gate.lock().await;
        let encoded = {
            let arena = self.arena.lock();
            codec::encode(&arena.snapshot())
        };
        let encoded = match encoded {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to encode queue");
                return false;
            }
        };

        match self.storage.save(&self.key, &encoded).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to persist queue");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MutationKind;
    use crate::impls::InMemoryStorage;
    use crate::impls::testing::FailingStorage;
    use serde_json::json;
    use ulid::Ulid;

    fn entry(n: i64) -> QueueEntry {
        QueueEntry::new(
            EntryId::from_ulid(Ulid::new()),
            MutationKind::UpdateScore,
            "test",
            json!({"n": n}),
            n,
        )
    }

    #[tokio::test]
    async fn every_mutation_is_persisted() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = QueueStore::new("q", storage.clone());

        let (a, b) = (entry(1), entry(2));
        let a_id = a.id;
        store.enqueue(a).await.unwrap();
        store.enqueue(b.clone()).await.unwrap();
        assert_eq!(codec::decode(&storage.get("q").unwrap()).unwrap().len(), 2);

        store.remove_by_id(&a_id).await.unwrap();
        let persisted = codec::decode(&storage.get("q").unwrap()).unwrap();
        assert_eq!(persisted, vec![b]);

        store.mutate(|arena| arena.bump_retry(&persisted[0].id)).await;
        let persisted = codec::decode(&storage.get("q").unwrap()).unwrap();
        assert_eq!(persisted[0].retry_count, 1);
    }

    #[tokio::test]
    async fn storage_failures_do_not_roll_back_memory() {
        let store = QueueStore::new("q", Arc::new(FailingStorage));

        store.enqueue(entry(1)).await.unwrap();
        store.enqueue(entry(2)).await.unwrap();

        assert_eq!(store.len(), 2);
        assert!(!store.persist().await);
        assert_eq!(store.restore().await, 0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.clear().await, 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn first_mutation_loads_persisted_queue_before_writing() {
        let storage = Arc::new(InMemoryStorage::new());
        let persisted = vec![entry(1), entry(2)];
        storage.insert("q", codec::encode(&persisted).unwrap());

        let store = QueueStore::new("q", storage.clone());
        let early = entry(3);
        store.enqueue(early.clone()).await.unwrap();

        let expected = vec![persisted[0].id, persisted[1].id, early.id];
        let ids: Vec<_> = store.snapshot().iter().map(|e| e.id).collect();
        assert_eq!(ids, expected);
        let on_disk: Vec<_> = codec::decode(&storage.get("q").unwrap())
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(on_disk, expected);

        // already loaded: reports what came from storage, reloads nothing
        assert_eq!(store.restore().await, 2);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn restore_loads_persisted_queue_in_order() {
        let storage = Arc::new(InMemoryStorage::new());
        let persisted = vec![entry(1), entry(2)];
        storage.insert("q", codec::encode(&persisted).unwrap());

        let store = QueueStore::new("q", storage);
        assert_eq!(store.restore().await, 2);
        assert_eq!(store.snapshot(), persisted);
    }

    #[tokio::test]
    async fn clear_before_restore_drops_the_previous_queue_too() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.insert("q", codec::encode(&[entry(1)]).unwrap());

        let store = QueueStore::new("q", storage.clone());
        assert_eq!(store.clear().await, 1);
        store.enqueue(entry(2)).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(codec::decode(&storage.get("q").unwrap()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn restore_of_corrupt_data_is_empty() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.insert("q", "\u{0}garbage".to_string());

        let store = QueueStore::new("q", storage);
        assert_eq!(store.restore().await, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_the_key() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = QueueStore::new("q", storage.clone());
        store.enqueue(entry(1)).await.unwrap();
        assert!(storage.get("q").is_some());

        assert_eq!(store.clear().await, 1);
        assert!(storage.get("q").is_none());
        assert_eq!(store.estimated_byte_size(), 0);
    }

    #[tokio::test]
    async fn in_flight_mark_is_not_persisted() {
        let storage = Arc::new(InMemoryStorage::new());
        let store = QueueStore::new("q", storage.clone());
        let e = entry(1);
        let id = e.id;
        store.enqueue(e).await.unwrap();

        store.mark(&[id], EntryStatus::InFlight);
        assert!(store.get(&id).unwrap().is_in_flight());

        store.persist().await;
        let persisted = codec::decode(&storage.get("q").unwrap()).unwrap();
        assert_eq!(persisted[0].status, EntryStatus::Pending);
    }
}
