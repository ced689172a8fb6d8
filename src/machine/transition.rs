//! The track ownership transition table.

use crate::core::{PlayerId, TrackState, TrackStatus};
use crate::enforcement::RaceViolation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fewest racers for a win to count. Rules may raise this, never lower it.
pub const DEFAULT_MIN_RACERS: u32 = 3;

/// Classification of a single race transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Unowned track taken by the winner.
    Claim,
    /// Owner won on an unlocked, unthreatened track.
    Lock,
    /// Owner won on an already locked track; nothing changes.
    Hold,
    /// Challenger won on a default track and became its hunter.
    Risk,
    /// Third party won on an at-risk track and replaced the hunter.
    Rethreat,
    /// Owner won on an at-risk track.
    Defend,
    /// Ownership moved to the winner of an at-risk track.
    Steal,
    /// Challenger won on a locked track; the lock is gone, owner stays.
    Break,
}

impl TransitionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Lock => "lock",
            Self::Hold => "hold",
            Self::Risk => "risk",
            Self::Rethreat => "rethreat",
            Self::Defend => "defend",
            Self::Steal => "steal",
            Self::Break => "break",
        }
    }

    /// Transitions after which the track has a new owner. Only these can
    /// complete a sweep.
    pub fn changes_owner(&self) -> bool {
        matches!(self, Self::Claim | Self::Steal)
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happens when someone other than owner or hunter wins an at-risk track.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HunterPolicy {
    /// The winner becomes the new hunter; the owner keeps the track.
    #[default]
    Rethreat,
    /// Any non-owner win takes the track.
    FreeForAll,
}

impl HunterPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rethreat" | "re-threat" => Some(Self::Rethreat),
            "free-for-all" | "freeforall" | "free_for_all" => Some(Self::FreeForAll),
            _ => None,
        }
    }
}

/// Parameters of the transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRules {
    pub min_racers: u32,
    pub hunter_policy: HunterPolicy,
}

impl TransitionRules {
    /// Racers a race must have to count: `min_racers`, floored at
    /// [`DEFAULT_MIN_RACERS`].
    pub fn required_racers(&self) -> u32 {
        self.min_racers.max(DEFAULT_MIN_RACERS)
    }
}

impl Default for TransitionRules {
    fn default() -> Self {
        Self {
            min_racers: DEFAULT_MIN_RACERS,
            hunter_policy: HunterPolicy::default(),
        }
    }
}

/// Result of applying one race to one track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub before: TrackStatus,
    pub after: TrackStatus,
    pub kind: TransitionKind,
}

/// Errors raised before any state changes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("Race needs at least {required} racers, got {actual}")]
    InsufficientRacers { required: u32, actual: u32 },

    #[error("Invalid race input: {}", describe(.violations))]
    InvalidTransitionInput { violations: Vec<RaceViolation> },

    #[error("Track status is corrupt ({reason}): {status}")]
    CorruptStatus {
        status: TrackStatus,
        reason: &'static str,
    },
}

fn describe(violations: &[RaceViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Apply a race result to a track's current status.
///
/// The racer count is checked before anything else; a short race is
/// rejected with [`TransitionError::InsufficientRacers`]. The function is
/// pure: persisting the outcome is the caller's job.
///
/// ```rust
/// use trackward::core::{PlayerId, TrackStatus};
/// use trackward::machine::{apply_result, TransitionKind, TransitionRules};
///
/// let rules = TransitionRules::default();
/// let owner = PlayerId(1);
/// let challenger = PlayerId(2);
///
/// let outcome = apply_result(&TrackStatus::owned(owner), challenger, 3, None, &rules).unwrap();
/// assert_eq!(outcome.kind, TransitionKind::Risk);
/// assert_eq!(outcome.after, TrackStatus::at_risk(owner, challenger));
///
/// assert!(apply_result(&TrackStatus::owned(owner), challenger, 2, None, &rules).is_err());
/// ```
pub fn apply_result(
    current: &TrackStatus,
    winner: PlayerId,
    racer_count: u32,
    loser: Option<PlayerId>,
    rules: &TransitionRules,
) -> Result<Outcome, TransitionError> {
    let required = rules.required_racers();
    if racer_count < required {
        return Err(TransitionError::InsufficientRacers {
            required,
            actual: racer_count,
        });
    }
    if loser == Some(winner) {
        return Err(TransitionError::InvalidTransitionInput {
            violations: vec![RaceViolation::LoserIsWinner(winner)],
        });
    }
    transition(current, winner, rules.hunter_policy)
}

/// The bare transition table, without the racer-count precondition.
pub fn transition(
    current: &TrackStatus,
    winner: PlayerId,
    policy: HunterPolicy,
) -> Result<Outcome, TransitionError> {
    if let Some(reason) = current.violation() {
        return Err(TransitionError::CorruptStatus {
            status: *current,
            reason,
        });
    }

    let (after, kind) = match (current.state, current.owner, current.threatened_by) {
        (_, None, _) => (TrackStatus::owned(winner), TransitionKind::Claim),

        (TrackState::Default, Some(owner), _) if owner == winner => {
            (TrackStatus::locked(owner), TransitionKind::Lock)
        }
        (TrackState::Default, Some(owner), _) => {
            (TrackStatus::at_risk(owner, winner), TransitionKind::Risk)
        }

        (TrackState::AtRisk, Some(owner), _) if owner == winner => {
            (TrackStatus::owned(owner), TransitionKind::Defend)
        }
        (TrackState::AtRisk, Some(_), Some(hunter)) if hunter == winner => {
            (TrackStatus::owned(winner), TransitionKind::Steal)
        }
        (TrackState::AtRisk, Some(owner), _) => match policy {
            HunterPolicy::Rethreat => (
                TrackStatus::at_risk(owner, winner),
                TransitionKind::Rethreat,
            ),
            HunterPolicy::FreeForAll => (TrackStatus::owned(winner), TransitionKind::Steal),
        },

        (TrackState::Locked, Some(owner), _) if owner == winner => {
            (TrackStatus::locked(owner), TransitionKind::Hold)
        }
        (TrackState::Locked, Some(owner), _) => {
            (TrackStatus::owned(owner), TransitionKind::Break)
        }
    };

    Ok(Outcome {
        before: *current,
        after,
        kind,
    })
}

/// Whether `winner` winning on a track at `before` leaves it at `after`.
pub fn leads_to(
    before: &TrackStatus,
    winner: PlayerId,
    after: &TrackStatus,
    policy: HunterPolicy,
) -> bool {
    transition(before, winner, policy).is_ok_and(|outcome| outcome.after == *after)
}

/// Whether `after` is reachable from `before` by some single race, whoever
/// won it.
///
/// Every candidate winner that could produce `after` is tried: the
/// pre-state's owner and hunter, the post-state's owner and hunter, and one
/// outsider standing for any other player. Recorded events name their
/// winner, so log verification checks that winner with [`leads_to`].
pub fn is_reachable(before: &TrackStatus, after: &TrackStatus, policy: HunterPolicy) -> bool {
    let named = [
        before.owner,
        before.threatened_by,
        after.owner,
        after.threatened_by,
    ];
    let outsider = named
        .iter()
        .flatten()
        .map(|player| player.get())
        .max()
        .map_or(PlayerId(0), |max| PlayerId(max.wrapping_add(1)));

    named
        .into_iter()
        .flatten()
        .chain(std::iter::once(outsider))
        .any(|winner| leads_to(before, winner, after, policy))
}
