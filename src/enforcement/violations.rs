//! Race input violations.

use crate::core::PlayerId;
use thiserror::Error;

/// A single problem with a submitted race result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RaceViolation {
    #[error("Winner {0} is not a known player")]
    UnknownWinner(PlayerId),

    #[error("Winner {0} is inactive")]
    InactiveWinner(PlayerId),

    #[error("Loser {0} is not a known player")]
    UnknownLoser(PlayerId),

    #[error("Loser {0} is inactive")]
    InactiveLoser(PlayerId),

    #[error("Loser {0} is also the winner")]
    LoserIsWinner(PlayerId),

    #[error("Racer {0} is not a known player")]
    UnknownRacer(PlayerId),

    #[error("Racer {0} is inactive")]
    InactiveRacer(PlayerId),

    #[error("Racer {0} is listed more than once")]
    DuplicateRacer(PlayerId),

    #[error("Winner {0} is not in the race roster")]
    WinnerNotRacing(PlayerId),

    #[error("Loser {0} is not in the race roster")]
    LoserNotRacing(PlayerId),

    #[error("Custom check failed: {message}")]
    CustomCheckFailed { message: String },
}
