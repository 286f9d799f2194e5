//! Test doubles for every port.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use crate::domain::{EntryId, QueueEntry, SendFailure};
use crate::ports::{Notifier, Sender, Storage, StorageError};

/// Records every batch and answers from a script, falling back to a default.
pub struct RecordingSender {
    batches: Mutex<Vec<Vec<QueueEntry>>>,
    script: Mutex<VecDeque<Result<(), SendFailure>>>,
    fallback: Result<(), SendFailure>,
    gate: Option<Arc<Semaphore>>,
    started: Notify,
}

impl RecordingSender {
    pub fn ok() -> Self {
        Self::with_fallback(Ok(()))
    }

    pub fn failing() -> Self {
        Self::with_fallback(Err(SendFailure::status(503, "unavailable")))
    }

    /// Answers `script` in order, then succeeds.
    pub fn scripted(script: Vec<Result<(), SendFailure>>) -> Self {
        let sender = Self::ok();
        *sender.script.lock() = script.into();
        sender
    }

    /// Every send blocks until [`RecordingSender::release`] hands out a permit.
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::ok()
        }
    }

    fn with_fallback(fallback: Result<(), SendFailure>) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            fallback,
            gate: None,
            started: Notify::new(),
        }
    }

    pub fn release(&self, sends: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(sends);
        }
    }

    /// Resolves once a send has started (and recorded its batch).
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn batch_ids(&self) -> Vec<Vec<EntryId>> {
        self.batches
            .lock()
            .iter()
            .map(|batch| batch.iter().map(|e| e.id).collect())
            .collect()
    }

    pub fn batches(&self) -> Vec<Vec<QueueEntry>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send(&self, batch: &[QueueEntry]) -> Result<(), SendFailure> {
        self.batches.lock().push(batch.to_vec());
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Every call fails.
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    async fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }

    async fn save(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk full".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk unavailable".to_string()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
