//! Why a season checkpoint could not be written or taken back in.

use crate::core::PlayerId;
use crate::journal::IntegrityError;
use crate::registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The season could not be encoded as JSON or bincode.
    #[error("Could not encode season checkpoint: {0}")]
    Encode(String),

    /// The input is not a season checkpoint in either format.
    #[error("Could not decode season checkpoint: {0}")]
    Decode(String),

    #[error("Season checkpoint version {found} is not supported (expected {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Cups and tracks of the checkpointed season are malformed.
    #[error("Checkpointed track registry is malformed: {0}")]
    Registry(#[from] RegistryError),

    /// The event log does not explain the checkpointed track statuses.
    #[error("Checkpointed event log failed verification: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Player {0} appears twice in the checkpoint")]
    DuplicatePlayer(PlayerId),

    /// A track or event names a player the checkpoint does not carry.
    #[error("Player {0} is referenced by the season but not included")]
    MissingPlayer(PlayerId),

    #[error("Checkpoint file error: {0}")]
    Io(#[from] std::io::Error),
}
