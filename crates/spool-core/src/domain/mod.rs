//! Domain model (entry ids, entries, sync events, delivery failures).

pub mod entry;
pub mod errors;
pub mod events;
pub mod ids;

pub use self::entry::{EntryKind, EntryStatus, LogLevel, MutationKind, QueueEntry};
pub use self::errors::{ErrorKind, SendFailure};
pub use self::events::{SyncStatus, SyncUpdate};
pub use self::ids::EntryId;
