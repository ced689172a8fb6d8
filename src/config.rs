//! Ledger configuration loaded from environment variables.

use crate::enforcement::{RaceRules, RaceRulesBuilder};
use crate::machine::{HunterPolicy, TransitionRules, DEFAULT_MIN_RACERS};
use std::path::PathBuf;
use thiserror::Error;

pub const MIN_RACERS_VAR: &str = "TRACKWARD_MIN_RACERS";
pub const HUNTER_POLICY_VAR: &str = "TRACKWARD_HUNTER_POLICY";
pub const DATABASE_VAR: &str = "TRACKWARD_DB";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number, got {value:?}")]
    NotANumber { var: &'static str, value: String },

    #[error("{var} must be at least {floor}, got {value}")]
    TooFewRacers {
        var: &'static str,
        value: u32,
        floor: u32,
    },

    #[error("{var} must be `rethreat` or `free-for-all`, got {value:?}")]
    UnknownPolicy { var: &'static str, value: String },
}

/// Settings for a [`Ledger`](crate::ledger::Ledger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Fewest racers a race may have (default and floor: `3`).
    pub min_racers: u32,
    /// Outcome of a third-party win on an at-risk track (default: re-threat).
    pub hunter_policy: HunterPolicy,
    /// SQLite file backing the ledger. `None` keeps everything in memory.
    pub database_path: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            min_racers: DEFAULT_MIN_RACERS,
            hunter_policy: HunterPolicy::default(),
            database_path: None,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `TRACKWARD_MIN_RACERS`    | `3`                     |
    /// | `TRACKWARD_HUNTER_POLICY` | `rethreat`              |
    /// | `TRACKWARD_DB`            | unset (memory only)     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`LedgerConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let min_racers = match lookup(MIN_RACERS_VAR) {
            Some(raw) => {
                let value: u32 = raw.trim().parse().map_err(|_| ConfigError::NotANumber {
                    var: MIN_RACERS_VAR,
                    value: raw.clone(),
                })?;
                if value < DEFAULT_MIN_RACERS {
                    return Err(ConfigError::TooFewRacers {
                        var: MIN_RACERS_VAR,
                        value,
                        floor: DEFAULT_MIN_RACERS,
                    });
                }
                value
            }
            None => DEFAULT_MIN_RACERS,
        };

        let hunter_policy = match lookup(HUNTER_POLICY_VAR) {
            Some(raw) => HunterPolicy::parse(&raw).ok_or(ConfigError::UnknownPolicy {
                var: HUNTER_POLICY_VAR,
                value: raw,
            })?,
            None => HunterPolicy::default(),
        };

        let database_path = lookup(DATABASE_VAR)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            min_racers,
            hunter_policy,
            database_path,
        })
    }

    pub fn transition_rules(&self) -> TransitionRules {
        TransitionRules {
            min_racers: self.min_racers,
            hunter_policy: self.hunter_policy,
        }
    }

    /// Race rules with the built-in checks and these transition parameters.
    pub fn race_rules(&self) -> RaceRules {
        RaceRulesBuilder::new()
            .transition_rules(self.transition_rules())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<LedgerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LedgerConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        assert_eq!(load(&[]).unwrap(), LedgerConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            (MIN_RACERS_VAR, " 4 "),
            (HUNTER_POLICY_VAR, "free-for-all"),
            (DATABASE_VAR, "/tmp/trackward.db"),
        ])
        .unwrap();
        assert_eq!(config.min_racers, 4);
        assert_eq!(config.hunter_policy, HunterPolicy::FreeForAll);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/trackward.db")));
        assert_eq!(config.race_rules().transition_rules().min_racers, 4);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[(MIN_RACERS_VAR, "three")]),
            Err(ConfigError::NotANumber { .. })
        ));
        assert_eq!(
            load(&[(MIN_RACERS_VAR, "1")]),
            Err(ConfigError::TooFewRacers {
                var: MIN_RACERS_VAR,
                value: 1,
                floor: 3
            })
        );
        assert!(matches!(
            load(&[(HUNTER_POLICY_VAR, "chaos")]),
            Err(ConfigError::UnknownPolicy { .. })
        ));
    }

    #[test]
    fn min_racers_cannot_go_below_three() {
        assert_eq!(
            load(&[(MIN_RACERS_VAR, "2")]),
            Err(ConfigError::TooFewRacers {
                var: MIN_RACERS_VAR,
                value: 2,
                floor: 3
            })
        );
        assert_eq!(load(&[(MIN_RACERS_VAR, "3")]).unwrap().min_racers, 3);
    }

    #[test]
    fn blank_database_path_means_memory() {
        assert_eq!(load(&[(DATABASE_VAR, "  ")]).unwrap().database_path, None);
    }
}
