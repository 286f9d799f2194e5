use thiserror::Error;

use crate::app::{BuildError, ConfigError};
use crate::queue::ArenaError;

#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("queue `{0}` is disabled")]
    Disabled(String),

    #[error(transparent)]
    DuplicateEntry(#[from] ArenaError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
