//! Queue entries and the kinds of work they carry.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::EntryId;

/// Tag identifying what an entry does (a mutation type, a log level, ...).
///
/// The queue itself never interprets it; senders route on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryKind(String);

impl EntryKind {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EntryKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// User actions replayed by the offline mutation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    CreateSession,
    UpdateSession,
    JoinSession,
    LeaveSession,
    UpdateScore,
}

impl MutationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MutationKind::CreateSession => "CREATE_SESSION",
            MutationKind::UpdateSession => "UPDATE_SESSION",
            MutationKind::JoinSession => "JOIN_SESSION",
            MutationKind::LeaveSession => "LEAVE_SESSION",
            MutationKind::UpdateScore => "UPDATE_SCORE",
        }
    }
}

impl From<MutationKind> for EntryKind {
    fn from(kind: MutationKind) -> Self {
        EntryKind::new(kind.as_str())
    }
}

/// Severity of a shipped log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for EntryKind {
    fn from(level: LogLevel) -> Self {
        EntryKind::new(level.as_str())
    }
}

/// Runtime-only delivery status. Never persisted; restored entries are `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryStatus {
    #[default]
    Pending,
    InFlight,
}

/// One pending unit of work.
///
/// Field names are camelCase on disk so queues written by older clients
/// still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(skip)]
    pub status: EntryStatus,
}

impl QueueEntry {
    pub fn new(
        id: EntryId,
        kind: impl Into<EntryKind>,
        context: impl Into<String>,
        payload: serde_json::Value,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            context: context.into(),
            payload,
            created_at,
            retry_count: 0,
            status: EntryStatus::Pending,
        }
    }

    /// Serialized JSON length of the payload, used for byte-threshold flushing.
    pub fn payload_size(&self) -> usize {
        serde_json::to_vec(&self.payload)
            .map(|bytes| bytes.len())
            .unwrap_or_default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.status == EntryStatus::InFlight
    }
}
