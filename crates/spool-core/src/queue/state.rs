//! Drain state machine.

use chrono::{DateTime, Utc};

/// Where the delivery engine is in its drain cycle.
///
/// State transitions:
/// - Idle -> Draining (timer, threshold, explicit flush; never for an empty queue)
/// - Draining -> Idle (every entry of the drain delivered or discarded)
/// - Draining -> Scheduled (send failed, retries remain)
/// - Scheduled -> Draining (retry timer fired)
/// - Scheduled -> Idle (destroy or clear cancels the timer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPhase {
    #[default]
    Idle,

    /// A send is in flight.
    Draining,

    /// Waiting for the retry timer.
    Scheduled { retry_at: DateTime<Utc> },
}

impl DrainPhase {
    /// Triggers arriving in a busy phase are coalesced.
    pub fn is_busy(self) -> bool {
        !matches!(self, DrainPhase::Idle)
    }

    pub fn retry_at(self) -> Option<DateTime<Utc>> {
        match self {
            DrainPhase::Scheduled { retry_at } => Some(retry_at),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DrainPhase::Idle => "idle",
            DrainPhase::Draining => "draining",
            DrainPhase::Scheduled { .. } => "scheduled",
        }
    }
}
