//! Seeded entities: tracks, cups, players and seasons.

use super::ids::{CupId, PlayerId, SeasonId, TrackId};
use super::state::TrackStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of tracks in every cup; also the sweep threshold.
pub const CUP_SIZE: usize = 4;

/// Display names keyed by language tag, with a required default name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayNames {
    pub name: String,
    pub localized: BTreeMap<String, String>,
}

impl DisplayNames {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            localized: BTreeMap::new(),
        }
    }

    pub fn with(mut self, lang: impl Into<String>, name: impl Into<String>) -> Self {
        self.localized.insert(lang.into(), name.into());
        self
    }

    /// Name for `lang`, falling back to the default name.
    pub fn get(&self, lang: &str) -> &str {
        self.localized
            .get(lang)
            .map(String::as_str)
            .unwrap_or(&self.name)
    }
}

/// A track and its current ownership status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    /// Unique within a season.
    pub code: String,
    pub cup: CupId,
    /// 1-based position inside the cup.
    pub position: u8,
    pub names: DisplayNames,
    pub status: TrackStatus,
}

/// Four tracks raced as a group. Immutable once seeded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cup {
    pub id: CupId,
    pub code: String,
    /// Sort key for listings.
    pub order: u32,
    pub names: DisplayNames,
    pub tracks: [TrackId; CUP_SIZE],
}

impl Cup {
    pub fn contains(&self, track: TrackId) -> bool {
        self.tracks.contains(&track)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Only active players may win races or own tracks.
    pub active: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            active: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonStatus {
    Active,
    /// Frozen: no further mutation of tracks or events.
    Archived,
}

/// Season metadata. A season owns one generation of tracks and cups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub label: String,
    pub starts_on: NaiveDate,
    /// Exclusive end of the season window.
    pub ends_on: NaiveDate,
    pub status: SeasonStatus,
}

impl Season {
    pub fn is_archived(&self) -> bool {
        self.status == SeasonStatus::Archived
    }

    /// Whether `date` falls inside `[starts_on, ends_on)`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.starts_on <= date && date < self.ends_on
    }
}
