//! In-memory entry arena.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;

use crate::domain::{EntryId, EntryStatus, QueueEntry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("duplicate entry id {0}")]
    DuplicateId(EntryId),
}

#[derive(Debug, Clone)]
struct Slot {
    entry: QueueEntry,
    payload_size: usize,
}

/// Entries keyed by id, plus the FIFO order as ids only.
///
/// Design:
/// - `slots` is the single source of truth for entry data.
/// - `order` holds EntryIds only; lookups never scan entries.
/// - Payloads are immutable once inserted, so the byte total stays exact.
#[derive(Debug, Clone, Default)]
pub struct EntryArena {
    slots: HashMap<EntryId, Slot>,
    order: VecDeque<EntryId>,
    payload_bytes: usize,
}

impl EntryArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail.
    pub fn push(&mut self, entry: QueueEntry) -> Result<(), ArenaError> {
        if self.slots.contains_key(&entry.id) {
            return Err(ArenaError::DuplicateId(entry.id));
        }
        let id = entry.id;
        let payload_size = entry.payload_size();
        self.payload_bytes += payload_size;
        self.slots.insert(
            id,
            Slot {
                entry,
                payload_size,
            },
        );
        self.order.push_back(id);
        Ok(())
    }

    pub fn get(&self, id: &EntryId) -> Option<&QueueEntry> {
        self.slots.get(id).map(|slot| &slot.entry)
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn remove(&mut self, id: &EntryId) -> Option<QueueEntry> {
        let slot = self.slots.remove(id)?;
        self.order.retain(|queued| queued != id);
        self.payload_bytes -= slot.payload_size;
        Some(slot.entry)
    }

    /// Remove every entry matching `predicate`, returned in queue order.
    pub fn remove_matching<F>(&mut self, mut predicate: F) -> Vec<QueueEntry>
    where
        F: FnMut(&QueueEntry) -> bool,
    {
        let doomed: Vec<EntryId> = self
            .order
            .iter()
            .filter(|id| self.slots.get(*id).is_some_and(|slot| predicate(&slot.entry)))
            .copied()
            .collect();
        doomed.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Increment the retry counter, returning the new value.
    pub fn bump_retry(&mut self, id: &EntryId) -> Option<u32> {
        let slot = self.slots.get_mut(id)?;
        slot.entry.retry_count = slot.entry.retry_count.saturating_add(1);
        Some(slot.entry.retry_count)
    }

    pub fn set_status(&mut self, id: &EntryId, status: EntryStatus) -> bool {
        match self.slots.get_mut(id) {
            Some(slot) => {
                slot.entry.status = status;
                true
            }
            None => false,
        }
    }

    /// First `n` entries in FIFO order.
    pub fn head(&self, n: usize) -> Vec<QueueEntry> {
        self.order
            .iter()
            .take(n)
            .filter_map(|id| self.get(id).cloned())
            .collect()
    }

    /// All entries in FIFO order.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.head(self.order.len())
    }

    pub fn ids(&self) -> Vec<EntryId> {
        self.order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sum of the serialized payload lengths.
    pub fn estimated_byte_size(&self) -> usize {
        self.payload_bytes
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.order.len();
        self.slots.clear();
        self.order.clear();
        self.payload_bytes = 0;
        dropped
    }
}
