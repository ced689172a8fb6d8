//! Validation-based admission of race submissions.
//!
//! Before a race result reaches the state machine it must pass the racer
//! count (aforo) rule and a set of input checks. Input checks use
//! Stillwater's `Validation` type so that every problem with a submission is
//! reported in one pass instead of one at a time.
//!
//! # Example
//!
//! ```rust
//! use trackward::enforcement::{RaceRules, RaceRulesBuilder};
//! use trackward::machine::HunterPolicy;
//!
//! let rules: RaceRules = RaceRulesBuilder::new()
//!     .min_racers(3)
//!     .hunter_policy(HunterPolicy::Rethreat)
//!     .build();
//! assert_eq!(rules.transition_rules().min_racers, 3);
//! ```

pub mod builder;
pub mod context;
pub mod rules;
pub mod violations;

// Re-export commonly used types
pub use builder::RaceRulesBuilder;
pub use context::{RaceContext, RaceSubmission, Racers};
pub use rules::{RaceCheck, RaceRules};
pub use violations::RaceViolation;
