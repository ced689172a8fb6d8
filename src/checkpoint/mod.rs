//! Whole-season checkpoints.
//!
//! A [`SeasonCheckpoint`] carries a season's registry and full event log,
//! plus the players it refers to, in a form that can be written as JSON or
//! compact binary and imported into another ledger. Imports are validated:
//! a checkpoint whose log does not explain its registry is refused.

use crate::core::{Player, SeasonId};
use crate::journal::verify_log;
use crate::ledger::{Ledger, LedgerError, SeasonBook};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable copy of one season and the players it mentions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCheckpoint {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: String,

    /// When checkpoint was created
    pub timestamp: DateTime<Utc>,

    pub book: SeasonBook,

    /// Players referenced anywhere in the season, sorted by id.
    pub players: Vec<Player>,
}

impl SeasonCheckpoint {
    pub fn new(book: SeasonBook, players: Vec<Player>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            book,
            players,
        }
    }

    pub fn season(&self) -> SeasonId {
        self.book.season.id
    }

    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CheckpointError::Encode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::Decode(e.to_string()))?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let checkpoint: Self = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::Decode(e.to_string()))?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    /// Write as JSON through a temporary file, so a crash never leaves a
    /// half-written checkpoint at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CheckpointError> {
        let path = path.as_ref();
        let temp = path.with_extension("tmp");
        fs::write(&temp, self.to_json()?)?;
        fs::rename(&temp, path)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Check format version and season consistency: registry invariants,
    /// every event explained by a legal transition, sweep chains intact and
    /// every mentioned player present.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            });
        }

        self.book.registry.verify()?;
        verify_log(self.season(), &self.book.log, &self.book.registry)?;

        let mut ids = BTreeSet::new();
        for player in &self.players {
            if !ids.insert(player.id) {
                return Err(CheckpointError::DuplicatePlayer(player.id));
            }
        }
        if let Some(missing) = self
            .book
            .referenced_players()
            .into_iter()
            .find(|player| !ids.contains(player))
        {
            return Err(CheckpointError::MissingPlayer(missing));
        }
        Ok(())
    }
}

impl<S: Store> Ledger<S> {
    /// Capture `season` with the players it mentions.
    pub fn checkpoint(&self, season: SeasonId) -> Result<SeasonCheckpoint, LedgerError> {
        let book = self
            .season(season)
            .ok_or(LedgerError::UnknownSeason(season))?;
        let players = book
            .referenced_players()
            .into_iter()
            .filter_map(|id| self.player(id).cloned())
            .collect();
        let checkpoint = SeasonCheckpoint::new(book.clone(), players);
        tracing::info!(
            season = %season,
            checkpoint = %checkpoint.id,
            events = checkpoint.book.log.len(),
            "Checkpoint taken"
        );
        Ok(checkpoint)
    }

    /// Import a checkpointed season. Fails if the season already exists.
    pub fn restore(&mut self, checkpoint: SeasonCheckpoint) -> Result<SeasonId, LedgerError> {
        checkpoint.validate()?;
        tracing::info!(
            season = %checkpoint.season(),
            checkpoint = %checkpoint.id,
            "Restoring checkpoint"
        );
        self.import_season(checkpoint.book, &checkpoint.players)
    }
}
