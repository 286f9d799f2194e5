//! Queue module: entry arena, codec, backoff policy, drain state, durable store.

mod arena;
mod backoff;
pub mod codec;
mod state;
mod store;

pub use arena::{ArenaError, EntryArena};
pub use backoff::{BackoffError, BackoffPolicy, DEFAULT_BACKOFF_MS, DEFAULT_MAX_RETRIES};
pub use codec::CodecError;
pub use state::DrainPhase;
pub use store::QueueStore;
