//! Race admission rules using Validation.

use crate::enforcement::context::RaceContext;
use crate::enforcement::violations::RaceViolation;
use crate::machine::{TransitionError, TransitionRules};
use std::collections::HashSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Type alias for race check functions
pub type RaceCheck =
    Box<dyn Fn(&RaceContext<'_>) -> Validation<(), NonEmptyVec<RaceViolation>> + Send + Sync>;

/// Rules a race submission must satisfy before it reaches the state machine.
/// Uses Validation to accumulate ALL violations.
pub struct RaceRules {
    pub(crate) transition: TransitionRules,
    pub(crate) required_checks: Vec<RaceCheck>,
}

impl Default for RaceRules {
    fn default() -> Self {
        Self {
            transition: TransitionRules::default(),
            required_checks: Vec::new(),
        }
    }
}

impl RaceRules {
    pub fn transition_rules(&self) -> &TransitionRules {
        &self.transition
    }

    /// Run every input check, accumulating ALL violations.
    /// The racer count is not part of this; see [`RaceRules::admit`].
    pub fn enforce(&self, context: &RaceContext<'_>) -> Validation<(), NonEmptyVec<RaceViolation>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<RaceViolation>>> = vec![
            check_winner(context),
            check_loser(context),
            check_roster(context),
        ];

        for check_fn in &self.required_checks {
            checks.push(check_fn(context));
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Admit or reject a submission.
    ///
    /// The racer count is checked first and on its own: a short race is
    /// reported as [`TransitionError::InsufficientRacers`] whatever else is
    /// wrong with it. Otherwise all violations are returned together.
    pub fn admit(&self, context: &RaceContext<'_>) -> Result<(), TransitionError> {
        let actual = context.racer_count();
        let required = self.transition.required_racers();
        if actual < required {
            return Err(TransitionError::InsufficientRacers {
                required,
                actual,
            });
        }

        match self.enforce(context) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(TransitionError::InvalidTransitionInput {
                violations: errors.iter().cloned().collect(),
            }),
        }
    }
}

fn check_winner(context: &RaceContext<'_>) -> Validation<(), NonEmptyVec<RaceViolation>> {
    let winner = context.submission.winner;
    match context.player(winner) {
        None => Validation::fail(RaceViolation::UnknownWinner(winner)),
        Some(player) if !player.active => Validation::fail(RaceViolation::InactiveWinner(winner)),
        Some(_) => Validation::success(()),
    }
}

fn check_loser(context: &RaceContext<'_>) -> Validation<(), NonEmptyVec<RaceViolation>> {
    let Some(loser) = context.submission.loser else {
        return Validation::success(());
    };
    if loser == context.submission.winner {
        return Validation::fail(RaceViolation::LoserIsWinner(loser));
    }
    match context.player(loser) {
        None => Validation::fail(RaceViolation::UnknownLoser(loser)),
        Some(player) if !player.active => Validation::fail(RaceViolation::InactiveLoser(loser)),
        Some(_) => Validation::success(()),
    }
}

fn check_roster(context: &RaceContext<'_>) -> Validation<(), NonEmptyVec<RaceViolation>> {
    let Some(roster) = context.submission.racers.roster() else {
        return Validation::success(());
    };

    let mut checks: Vec<Validation<(), NonEmptyVec<RaceViolation>>> = Vec::new();
    let mut seen = HashSet::new();
    for &racer in roster {
        if !seen.insert(racer) {
            checks.push(Validation::fail(RaceViolation::DuplicateRacer(racer)));
            continue;
        }
        // The winner is reported by check_winner.
        match context.player(racer) {
            None if racer != context.submission.winner => {
                checks.push(Validation::fail(RaceViolation::UnknownRacer(racer)))
            }
            Some(player) if !player.active && racer != context.submission.winner => {
                checks.push(Validation::fail(RaceViolation::InactiveRacer(racer)))
            }
            _ => {}
        }
    }

    let winner = context.submission.winner;
    if !roster.contains(&winner) {
        checks.push(Validation::fail(RaceViolation::WinnerNotRacing(winner)));
    }
    if let Some(loser) = context.submission.loser {
        if !roster.contains(&loser) {
            checks.push(Validation::fail(RaceViolation::LoserNotRacing(loser)));
        }
    }

    Validation::all_vec(checks).map(|_| ())
}
