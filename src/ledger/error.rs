use crate::checkpoint::CheckpointError;
use crate::core::{PlayerId, SeasonId, TrackId};
use crate::deactivation::DeactivationError;
use crate::journal::IntegrityError;
use crate::machine::TransitionError;
use crate::registry::RegistryError;
use crate::store::StoreError;
use crate::undo::UndoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Unknown season {0}")]
    UnknownSeason(SeasonId),

    #[error("Season {0} is archived")]
    SeasonArchived(SeasonId),

    #[error("Season {0} already exists")]
    DuplicateSeason(SeasonId),

    #[error("Season {open} is still open; archive it before opening {requested}")]
    SeasonStillOpen {
        open: SeasonId,
        requested: SeasonId,
    },

    #[error("Player {player} owns a track in season {season} but is inactive")]
    InactiveOwner { season: SeasonId, player: PlayerId },

    #[error("Unknown track {track} in season {season}")]
    UnknownTrack { season: SeasonId, track: TrackId },

    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("Player name {0:?} is already taken")]
    DuplicatePlayer(String),

    #[error("Invalid season seed: {0}")]
    InvalidSeed(#[from] RegistryError),

    #[error("Season log failed verification: {0}")]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Undo(#[from] UndoError),

    #[error(transparent)]
    Deactivation(#[from] DeactivationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
