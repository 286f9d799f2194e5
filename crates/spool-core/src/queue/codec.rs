//! Entry codec: the on-disk format of a queue.
//!
//! A queue is persisted as a JSON array of entries in FIFO order.
//! Transient fields (`status`) are never written and come back as `Pending`.

use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

use crate::domain::QueueEntry;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("queue JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode(entries: &[QueueEntry]) -> Result<String, CodecError> {
    Ok(serde_json::to_string(entries)?)
}

/// Strict decode: any malformed element fails the whole queue.
pub fn decode(raw: &str) -> Result<Vec<QueueEntry>, CodecError> {
    let entries: Vec<QueueEntry> = serde_json::from_str(raw)?;
    Ok(dedup(entries))
}

/// Restore-path decode. Never fails.
///
/// - Not a JSON array at all: empty queue.
/// - A malformed element: that element is dropped, the rest survive.
/// - Duplicate ids: the first occurrence wins.
pub fn decode_lenient(raw: &str) -> Vec<QueueEntry> {
    let items: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(err) => {
            warn!(error = %err, "persisted queue is corrupt; starting empty");
            return Vec::new();
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<QueueEntry>(item) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!(index, error = %err, "dropping malformed persisted entry"),
        }
    }
    dedup(entries)
}

fn dedup(entries: Vec<QueueEntry>) -> Vec<QueueEntry> {
    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .into_iter()
        .filter(|entry| {
            let fresh = seen.insert(entry.id);
            if !fresh {
                warn!(entry_id = %entry.id, "dropping duplicate persisted entry");
            }
            fresh
        })
        .collect()
}
