//! The state machine: pure transition logic and sweep detection.
//!
//! Nothing in this module touches the registry or the event log. Given the
//! prior status and a race result it deterministically returns the next
//! status and its classification; the ledger snapshots and persists it.

mod sweep;
mod transition;

pub use sweep::{detect_sweep, SweepEffect};
pub use transition::{
    apply_result, is_reachable, leads_to, transition, HunterPolicy, Outcome, TransitionError,
    TransitionKind, TransitionRules, DEFAULT_MIN_RACERS,
};
