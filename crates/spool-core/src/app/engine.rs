//! Delivery engine: drains the queue store against the sender.
//!
//! The engine is passive. Timers and external events call in through
//! `on_timer_tick`, `on_retry_timer`, `on_reachability_changed` and
//! `flush_now`; [`crate::app::DeliveryDriver`] wires those to tokio, tests
//! call them directly with a `ManualClock`.
//!
//! At most one drain runs at a time. A trigger that arrives while a drain is
//! in flight or a retry is scheduled is coalesced and returns
//! [`DrainOutcome::Coalesced`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::config::{DeliveryMode, QueueConfig};
use super::stats::QueueStats;
use super::status::{StatusBroadcaster, StatusListener, Subscription};
use crate::domain::{EntryId, EntryKind, EntryStatus, QueueEntry, SyncUpdate};
use crate::error::SpoolError;
use crate::ports::{Clock, IdGenerator, Notifier, Reachability, Sender, Storage};
use crate::queue::{BackoffPolicy, DrainPhase, QueueStore};

/// Why a drain was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Timer,
    QueueSize,
    ByteSize,
    Explicit,
    ReachabilityRegained,
    RetryTimer,
    Shutdown,
}

impl TriggerReason {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerReason::Timer => "timer",
            TriggerReason::QueueSize => "queue_size",
            TriggerReason::ByteSize => "byte_size",
            TriggerReason::Explicit => "explicit",
            TriggerReason::ReachabilityRegained => "reachability_regained",
            TriggerReason::RetryTimer => "retry_timer",
            TriggerReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a trigger ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing queued; the sender was not called.
    Empty,
    /// Another drain is in flight or a retry is already scheduled.
    Coalesced,
    Disabled,
    Destroyed,
    /// The event did not call for a drain (retry not due, reachability lost, ...).
    Skipped,
    /// Drain ran to the end of the queue.
    Drained { sent: usize, discarded: usize },
    /// A send failed and a retry is pending.
    Scheduled {
        delay: Duration,
        retry_at: DateTime<Utc>,
    },
}

/// Progress of one drain as reported to subscribers.
#[derive(Debug, Clone, Copy, Default)]
struct DrainSession {
    total: usize,
    completed: usize,
    discarded: usize,
}

enum SessionStep {
    Finished { sent: usize, discarded: usize },
    Retry {
        sent: usize,
        discarded: usize,
        delay: Duration,
        retry_at: DateTime<Utc>,
        retry_count: u32,
    },
}

#[derive(Debug)]
struct EngineState {
    phase: DrainPhase,
    /// Kept across `Scheduled` so a retried drain continues its progress counts.
    session: Option<DrainSession>,
    online: bool,
    reachability_attached: bool,
    destroyed: bool,
    current_retry_count: u32,
}

/// Everything the engine talks to. Assembled by `DeliveryQueueBuilder`.
pub(crate) struct Collaborators {
    pub sender: Arc<dyn Sender>,
    pub storage: Arc<dyn Storage>,
    pub reachability: Arc<dyn Reachability>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
}

pub struct DeliveryQueue {
    config: QueueConfig,
    backoff: BackoffPolicy,
    store: QueueStore,
    sender: Arc<dyn Sender>,
    reachability: Arc<dyn Reachability>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    status: StatusBroadcaster,
    state: Mutex<EngineState>,
    schedule_changed: Notify,
}

impl DeliveryQueue {
    pub(crate) fn new(config: QueueConfig, backoff: BackoffPolicy, parts: Collaborators) -> Self {
        let online = parts.reachability.is_online();
        Self {
            store: QueueStore::new(config.storage_key.clone(), parts.storage),
            config,
            backoff,
            sender: parts.sender,
            reachability: parts.reachability,
            notifier: parts.notifier,
            clock: parts.clock,
            ids: parts.ids,
            status: StatusBroadcaster::new(),
            state: Mutex::new(EngineState {
                phase: DrainPhase::Idle,
                session: None,
                online,
                reachability_attached: true,
                destroyed: false,
                current_retry_count: 0,
            }),
            schedule_changed: Notify::new(),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    // ------------------------------------------------------------------
    // Producer API
    // ------------------------------------------------------------------

    /// Queue one unit of work, stamped with the current clock.
    ///
    /// Persists before returning (a storage failure is logged, not returned).
    /// While offline, the notifier is told once per call.
    pub async fn enqueue(
        &self,
        kind: impl Into<EntryKind>,
        context: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<EntryId, SpoolError> {
        let created_at = self.clock.now_millis();
        self.enqueue_entry(kind.into(), context.into(), payload, created_at)
            .await
    }

    /// Same as [`DeliveryQueue::enqueue`] with a caller-supplied timestamp.
    pub async fn enqueue_at(
        &self,
        kind: impl Into<EntryKind>,
        context: impl Into<String>,
        payload: serde_json::Value,
        created_at: i64,
    ) -> Result<EntryId, SpoolError> {
        self.enqueue_entry(kind.into(), context.into(), payload, created_at)
            .await
    }

    async fn enqueue_entry(
        &self,
        kind: EntryKind,
        context: String,
        payload: serde_json::Value,
        created_at: i64,
    ) -> Result<EntryId, SpoolError> {
        if !self.config.enabled {
            return Err(SpoolError::Disabled(self.config.name.clone()));
        }

        let entry = QueueEntry::new(self.ids.generate_entry_id(), kind, context, payload, created_at);
        let id = entry.id;
        debug!(queue = %self.config.name, entry_id = %id, kind = %entry.kind, "enqueue");
        self.store.enqueue(entry).await?;

        if self.config.notify_offline && !self.reachability.is_online() {
            self.notifier.notify(&self.config.offline_message);
        }

        if let Some(reason) = self.threshold_reached() {
            let outcome = self.trigger(reason).await;
            debug!(queue = %self.config.name, %reason, ?outcome, "threshold flush");
        }
        Ok(id)
    }

    pub fn queue_length(&self) -> usize {
        self.store.len()
    }

    pub fn estimated_byte_size(&self) -> usize {
        self.store.estimated_byte_size()
    }

    /// Pending entries in delivery order.
    pub fn snapshot(&self) -> Vec<QueueEntry> {
        self.store.snapshot()
    }

    pub fn subscribe_sync_status(&self, listener: impl StatusListener + 'static) -> Subscription {
        self.status.subscribe(listener)
    }

    /// Load whatever a previous process left in storage. Does not drain.
    pub async fn initialize_from_storage(&self) -> usize {
        let restored = self.store.restore().await;
        info!(queue = %self.config.name, restored, "initialized from storage");
        restored
    }

    /// Drop every pending entry and its persisted copy. Cancels a pending retry.
    pub async fn clear(&self) -> usize {
        let dropped = self.store.clear().await;
        {
            let mut state = self.state.lock();
            state.current_retry_count = 0;
            if matches!(state.phase, DrainPhase::Scheduled { .. }) {
                state.phase = DrainPhase::Idle;
                state.session = None;
            }
        }
        self.schedule_changed.notify_waiters();
        info!(queue = %self.config.name, dropped, "queue cleared");
        dropped
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            name: self.config.name.clone(),
            enabled: self.config.enabled,
            queue_length: self.store.len(),
            estimated_byte_size: self.store.estimated_byte_size(),
            max_queue_size: self.config.max_queue_size,
            max_byte_size: self.config.max_byte_size,
            max_retries: self.backoff.max_retries(),
            flush_interval_ms: self.config.flush_interval_ms,
            current_retry_count: state.current_retry_count,
            phase: state.phase.as_str().to_string(),
            retry_at_millis: state.phase.retry_at().map(|at| at.timestamp_millis()),
            destroyed: state.destroyed,
        }
    }

    // ------------------------------------------------------------------
    // Event entry points
    // ------------------------------------------------------------------

    /// Explicit flush (app backgrounding, pull-to-refresh, ...).
    pub async fn flush_now(&self) -> DrainOutcome {
        self.trigger(TriggerReason::Explicit).await
    }

    /// The periodic flush interval elapsed.
    pub async fn on_timer_tick(&self) -> DrainOutcome {
        self.trigger(TriggerReason::Timer).await
    }

    /// The retry timer fired. Drains only if the scheduled retry is due.
    pub async fn on_retry_timer(&self) -> DrainOutcome {
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return DrainOutcome::Destroyed;
            }
            let phase = state.phase;
            match phase {
                DrainPhase::Scheduled { retry_at } if self.clock.now() >= retry_at => {
                    state.phase = DrainPhase::Draining;
                }
                DrainPhase::Draining => return DrainOutcome::Coalesced,
                _ => return DrainOutcome::Skipped,
            }
        }
        info!(
            queue = %self.config.name,
            reason = %TriggerReason::RetryTimer,
            retry_count = self.state.lock().current_retry_count,
            "drain resumed"
        );
        self.run_drain(false).await
    }

    /// Connectivity changed. Regaining it requests a flush; losing it does not
    /// stop anything (drains keep relying on send failures and backoff).
    pub async fn on_reachability_changed(&self, online: bool) -> DrainOutcome {
        let regained = {
            let mut state = self.state.lock();
            if !state.reachability_attached {
                return DrainOutcome::Destroyed;
            }
            let regained = online && !state.online;
            state.online = online;
            regained
        };
        if !regained {
            debug!(queue = %self.config.name, online, "reachability changed");
            return DrainOutcome::Skipped;
        }
        info!(queue = %self.config.name, pending = self.store.len(), "connectivity regained");
        self.trigger(TriggerReason::ReachabilityRegained).await
    }

    /// Cancel timers, detach from reachability, and make one last best-effort
    /// pass over the queue: each entry is attempted at most once and nothing is
    /// rescheduled. Entries that still fail stay persisted for the next start.
    pub async fn destroy(&self) -> DrainOutcome {
        let in_flight = {
            let mut state = self.state.lock();
            if state.destroyed {
                return DrainOutcome::Destroyed;
            }
            state.destroyed = true;
            state.reachability_attached = false;
            let phase = state.phase;
            match phase {
                DrainPhase::Draining => true,
                DrainPhase::Scheduled { .. } => {
                    state.phase = DrainPhase::Idle;
                    false
                }
                DrainPhase::Idle => false,
            }
        };
        self.schedule_changed.notify_waiters();
        info!(queue = %self.config.name, pending = self.store.len(), "destroying delivery queue");

        if in_flight {
            // the running drain sees `destroyed` and stops rescheduling
            return DrainOutcome::Coalesced;
        }
        if !self.config.enabled {
            return DrainOutcome::Disabled;
        }
        self.store.restore().await;
        {
            let mut state = self.state.lock();
            if self.store.is_empty() {
                state.session = None;
                return DrainOutcome::Empty;
            }
            state.phase = DrainPhase::Draining;
        }
        info!(queue = %self.config.name, reason = %TriggerReason::Shutdown, "final drain");
        self.run_drain(true).await
    }

    // ------------------------------------------------------------------
    // Driver support
    // ------------------------------------------------------------------

    pub fn phase(&self) -> DrainPhase {
        self.state.lock().phase
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    pub fn flush_interval(&self) -> Duration {
        self.config.flush_interval()
    }

    /// Time left until the scheduled retry, if one is pending.
    pub fn retry_delay(&self) -> Option<Duration> {
        let retry_at = self.state.lock().phase.retry_at()?;
        Some((retry_at - self.clock.now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Resolves when a retry is scheduled or cancelled.
    pub fn schedule_changed(&self) -> Notified<'_> {
        self.schedule_changed.notified()
    }

    /// Change stream of the reachability port, until `destroy()` detaches it.
    pub fn reachability_watch(&self) -> Option<watch::Receiver<bool>> {
        if !self.state.lock().reachability_attached {
            return None;
        }
        self.reachability.watch()
    }

    // ------------------------------------------------------------------
    // Drain
    // ------------------------------------------------------------------

    fn threshold_reached(&self) -> Option<TriggerReason> {
        if self.store.len() >= self.config.max_queue_size {
            Some(TriggerReason::QueueSize)
        } else if self.store.estimated_byte_size() >= self.config.max_byte_size {
            Some(TriggerReason::ByteSize)
        } else {
            None
        }
    }

    async fn trigger(&self, reason: TriggerReason) -> DrainOutcome {
        if !self.config.enabled {
            return DrainOutcome::Disabled;
        }
        // a drain must see what a previous process left behind
        self.store.restore().await;
        {
            let mut state = self.state.lock();
            if state.destroyed {
                return DrainOutcome::Destroyed;
            }
            if state.phase.is_busy() {
                debug!(
                    queue = %self.config.name,
                    %reason,
                    phase = state.phase.as_str(),
                    "drain already pending; coalesced"
                );
                return DrainOutcome::Coalesced;
            }
            if self.store.is_empty() {
                return DrainOutcome::Empty;
            }
            state.phase = DrainPhase::Draining;
        }
        info!(queue = %self.config.name, %reason, pending = self.store.len(), "drain started");
        self.run_drain(false).await
    }

    /// Caller has already moved the phase to `Draining`.
    async fn run_drain(&self, final_pass: bool) -> DrainOutcome {
        let mut attempted: HashSet<EntryId> = HashSet::new();
        let mut sent = 0;
        let mut discarded = 0;

        loop {
            let (mut session, fresh) = {
                let mut state = self.state.lock();
                match state.session.take() {
                    Some(session) => (session, false),
                    None => (
                        DrainSession {
                            total: self.untried(&attempted),
                            ..DrainSession::default()
                        },
                        true,
                    ),
                }
            };
            if fresh {
                if session.total == 0 {
                    break;
                }
                self.status.emit(SyncUpdate::syncing(0, session.total));
            }

            match self.drain_session(&mut session, final_pass, &mut attempted).await {
                SessionStep::Finished {
                    sent: s,
                    discarded: d,
                } => {
                    sent += s;
                    discarded += d;
                    self.finish_session(session);
                }
                SessionStep::Retry {
                    sent: s,
                    discarded: d,
                    delay,
                    retry_at,
                    retry_count,
                } => {
                    sent += s;
                    discarded += d;
                    let scheduled = {
                        let mut state = self.state.lock();
                        if state.destroyed {
                            false
                        } else {
                            state.phase = DrainPhase::Scheduled { retry_at };
                            state.session = Some(session);
                            true
                        }
                    };
                    if scheduled {
                        self.schedule_changed.notify_waiters();
                        info!(
                            queue = %self.config.name,
                            sent,
                            discarded,
                            retry_count,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "retry scheduled"
                        );
                        return DrainOutcome::Scheduled { delay, retry_at };
                    }
                    self.finish_session(session);
                    break;
                }
            }

            // a finished session is followed by a fresh one while untried
            // entries remain (newer arrivals, or everything left on a final pass)
            if self.untried(&attempted) == 0 {
                break;
            }
        }

        {
            let mut state = self.state.lock();
            state.phase = DrainPhase::Idle;
            state.session = None;
        }
        info!(
            queue = %self.config.name,
            sent,
            discarded,
            pending = self.store.len(),
            "drain finished"
        );
        DrainOutcome::Drained { sent, discarded }
    }

    async fn drain_session(
        &self,
        session: &mut DrainSession,
        final_pass: bool,
        attempted: &mut HashSet<EntryId>,
    ) -> SessionStep {
        let mut sent = 0;
        let mut discarded = 0;

        while session.completed < session.total {
            let batch = self.next_batch(session.total - session.completed, attempted);
            if batch.is_empty() {
                break;
            }
            let ids: Vec<EntryId> = batch.iter().map(|entry| entry.id).collect();
            self.store.mark(&ids, EntryStatus::InFlight);
            debug!(queue = %self.config.name, batch = ids.len(), "sending");

            let result = self.sender.send(&batch).await;
            attempted.extend(ids.iter().copied());

            match result {
                Ok(()) => {
                    let delivered = &ids;
                    self.store
                        .mutate(|arena| {
                            for id in delivered {
                                arena.remove(id);
                            }
                        })
                        .await;
                    self.state.lock().current_retry_count = 0;
                    for _ in &ids {
                        session.completed += 1;
                        self.status
                            .emit(SyncUpdate::syncing(session.completed, session.total));
                    }
                    sent += ids.len();
                }
                Err(failure) => {
                    warn!(
                        queue = %self.config.name,
                        batch = ids.len(),
                        status_code = ?failure.status_code,
                        kind = ?failure.kind(),
                        error = %failure,
                        "send failed"
                    );
                    let failed = &ids;
                    let backoff = &self.backoff;
                    let (dropped, highest) = self
                        .store
                        .mutate(|arena| {
                            let mut dropped = Vec::new();
                            let mut highest: Option<u32> = None;
                            for id in failed {
                                let Some(count) = arena.bump_retry(id) else {
                                    continue;
                                };
                                if backoff.should_discard(count) {
                                    dropped.extend(arena.remove(id));
                                } else {
                                    arena.set_status(id, EntryStatus::Pending);
                                    highest = Some(highest.map_or(count, |h| h.max(count)));
                                }
                            }
                            (dropped, highest)
                        })
                        .await;

                    for entry in &dropped {
                        error!(
                            queue = %self.config.name,
                            entry_id = %entry.id,
                            kind = %entry.kind,
                            retry_count = entry.retry_count,
                            "discarding entry after exhausting retries"
                        );
                        session.completed += 1;
                        session.discarded += 1;
                        self.status
                            .emit(SyncUpdate::syncing(session.completed, session.total));
                    }
                    discarded += dropped.len();

                    let Some(retry_count) = highest else {
                        self.state.lock().current_retry_count = 0;
                        continue;
                    };
                    let destroyed = {
                        let mut state = self.state.lock();
                        state.current_retry_count = retry_count;
                        state.destroyed
                    };
                    if final_pass || destroyed {
                        continue;
                    }

                    let delay = self.backoff.delay_for(retry_count);
                    let now = self.clock.now();
                    let retry_at = chrono::Duration::from_std(delay)
                        .ok()
                        .and_then(|delay| now.checked_add_signed(delay))
                        .unwrap_or(DateTime::<Utc>::MAX_UTC);
                    return SessionStep::Retry {
                        sent,
                        discarded,
                        delay,
                        retry_at,
                        retry_count,
                    };
                }
            }
        }

        SessionStep::Finished { sent, discarded }
    }

    fn untried(&self, attempted: &HashSet<EntryId>) -> usize {
        self.store
            .snapshot()
            .iter()
            .filter(|entry| !attempted.contains(&entry.id))
            .count()
    }

    /// Entries not yet attempted in this drain, in FIFO order.
    fn next_batch(&self, remaining: usize, attempted: &HashSet<EntryId>) -> Vec<QueueEntry> {
        let limit = match self.config.mode {
            DeliveryMode::Single => 1,
            DeliveryMode::Batch => remaining,
        };
        self.store
            .snapshot()
            .into_iter()
            .filter(|entry| !attempted.contains(&entry.id))
            .take(limit)
            .collect()
    }

    fn finish_session(&self, session: DrainSession) {
        let clean = session.discarded == 0 && session.completed >= session.total;
        let update = if clean {
            SyncUpdate::synced(session.completed, session.total)
        } else {
            SyncUpdate::failed(session.completed, session.total)
        };
        self.status.emit(update);
    }
}
