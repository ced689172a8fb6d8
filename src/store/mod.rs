//! Persistence behind the ledger's commit boundary.
//!
//! The ledger calls a [`Store`] before touching memory; an error from any
//! method aborts the operation with nothing applied.

mod sqlite;

pub use sqlite::{open_ledger, SqliteStore};

use crate::core::{Player, SeasonId, SeasonStatus};
use crate::journal::IntegrityError;
use crate::ledger::{Changeset, SeasonBook};
use crate::registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("Stored season is invalid: {0}")]
    Registry(#[from] RegistryError),

    #[error("Stored log is invalid: {0}")]
    Integrity(#[from] IntegrityError),
}

pub trait Store {
    fn put_player(&mut self, player: &Player) -> Result<(), StoreError>;

    /// Store a whole season, history included, together with any players
    /// it introduces.
    fn put_season(&mut self, book: &SeasonBook, players: &[Player]) -> Result<(), StoreError>;

    fn set_season_status(&mut self, season: SeasonId, status: SeasonStatus)
        -> Result<(), StoreError>;

    /// Persist every write in `changes`, or none of them.
    fn commit(&mut self, changes: &Changeset) -> Result<(), StoreError>;
}

/// Store that keeps nothing; the ledger's memory is the only copy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ephemeral;

impl Store for Ephemeral {
    fn put_player(&mut self, _player: &Player) -> Result<(), StoreError> {
        Ok(())
    }

    fn put_season(&mut self, _book: &SeasonBook, _players: &[Player]) -> Result<(), StoreError> {
        Ok(())
    }

    fn set_season_status(
        &mut self,
        _season: SeasonId,
        _status: SeasonStatus,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn commit(&mut self, _changes: &Changeset) -> Result<(), StoreError> {
        Ok(())
    }
}
