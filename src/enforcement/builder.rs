//! Builder API for race admission rules.

use crate::enforcement::context::RaceContext;
use crate::enforcement::rules::{RaceCheck, RaceRules};
use crate::enforcement::violations::RaceViolation;
use crate::machine::{HunterPolicy, TransitionRules, DEFAULT_MIN_RACERS};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Builder for creating race rules
pub struct RaceRulesBuilder {
    transition: TransitionRules,
    required_checks: Vec<RaceCheck>,
}

impl RaceRulesBuilder {
    pub fn new() -> Self {
        Self {
            transition: TransitionRules::default(),
            required_checks: Vec::new(),
        }
    }

    /// Set the fewest racers for a win to count. Values below
    /// [`DEFAULT_MIN_RACERS`] are raised to it.
    pub fn min_racers(mut self, n: u32) -> Self {
        self.transition.min_racers = n.max(DEFAULT_MIN_RACERS);
        self
    }

    /// Set how third-party wins on at-risk tracks resolve
    pub fn hunter_policy(mut self, policy: HunterPolicy) -> Self {
        self.transition.hunter_policy = policy;
        self
    }

    /// Replace the transition parameters wholesale
    pub fn transition_rules(mut self, rules: TransitionRules) -> Self {
        self.transition = rules;
        self.transition.min_racers = rules.required_racers();
        self
    }

    /// Add a custom validation check
    pub fn require<F>(mut self, check: F) -> Self
    where
        F: Fn(&RaceContext<'_>) -> Validation<(), NonEmptyVec<RaceViolation>>
            + Send
            + Sync
            + 'static,
    {
        self.required_checks.push(Box::new(check));
        self
    }

    /// Add a simple predicate check with error message
    pub fn require_pred<F>(self, predicate: F, error_msg: String) -> Self
    where
        F: Fn(&RaceContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.require(move |ctx| {
            if predicate(ctx) {
                Validation::success(())
            } else {
                Validation::fail(RaceViolation::CustomCheckFailed {
                    message: error_msg.clone(),
                })
            }
        })
    }

    /// Build the race rules
    pub fn build(self) -> RaceRules {
        RaceRules {
            transition: self.transition,
            required_checks: self.required_checks,
        }
    }
}

impl Default for RaceRulesBuilder {
    fn default() -> Self {
        Self::new()
    }
}
