//! Track registry: the current status of every track in one season.
//!
//! The registry is a plain data store. Statuses change only through the
//! ledger, which applies state machine outcomes, sweep locks, deactivation
//! releases and undo restorations.

use crate::core::{
    Cup, CupId, PlayerId, Track, TrackId, TrackSnapshot, TrackState, TrackStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Structural problems in a season's tracks and cups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Track id {0} is used more than once")]
    DuplicateTrackId(TrackId),

    #[error("Cup id {0} is used more than once")]
    DuplicateCupId(CupId),

    #[error("Cup {cup} lists track {track} more than once")]
    DuplicateTrackInCup { cup: CupId, track: TrackId },

    #[error("Cup {cup} lists unknown track {track}")]
    MissingTrack { cup: CupId, track: TrackId },

    #[error("Track {track} belongs to cup {expected} but is listed by cup {found}")]
    CupMismatch {
        track: TrackId,
        expected: CupId,
        found: CupId,
    },

    #[error("Track {0} is not listed by any cup")]
    OrphanTrack(TrackId),

    #[error("Track code '{0}' is used more than once")]
    DuplicateCode(String),

    #[error("Cup code '{0}' is used more than once")]
    DuplicateCupCode(String),

    #[error("Track {track} has an inconsistent status: {reason}")]
    InconsistentStatus { track: TrackId, reason: &'static str },
}

/// Filters for [`TrackRegistry::list`], mirroring the standings view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFilter {
    pub owner: Option<PlayerId>,
    pub cup_code: Option<String>,
    pub state: Option<TrackState>,
}

impl TrackFilter {
    pub fn owner(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn cup(mut self, code: impl Into<String>) -> Self {
        self.cup_code = Some(code.into());
        self
    }

    pub fn state(mut self, state: TrackState) -> Self {
        self.state = Some(state);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRegistry {
    tracks: BTreeMap<TrackId, Track>,
    cups: BTreeMap<CupId, Cup>,
}

impl TrackRegistry {
    /// Build a registry, checking that ids are unique, every cup names
    /// four distinct known tracks, every track sits in exactly the cup it
    /// claims, codes are unique and every status is consistent.
    pub fn new(cups: Vec<Cup>, tracks: Vec<Track>) -> Result<Self, RegistryError> {
        let mut by_id = BTreeMap::new();
        for track in tracks {
            let id = track.id;
            if by_id.insert(id, track).is_some() {
                return Err(RegistryError::DuplicateTrackId(id));
            }
        }
        let mut cups_by_id = BTreeMap::new();
        for cup in cups {
            let id = cup.id;
            if cups_by_id.insert(id, cup).is_some() {
                return Err(RegistryError::DuplicateCupId(id));
            }
        }

        let registry = Self {
            tracks: by_id,
            cups: cups_by_id,
        };
        registry.verify()?;
        Ok(registry)
    }

    pub fn verify(&self) -> Result<(), RegistryError> {
        let mut listed = HashSet::new();
        let mut cup_codes = HashSet::new();
        for cup in self.cups.values() {
            if !cup_codes.insert(cup.code.as_str()) {
                return Err(RegistryError::DuplicateCupCode(cup.code.clone()));
            }
            let mut in_cup = HashSet::new();
            for &track_id in &cup.tracks {
                if !in_cup.insert(track_id) {
                    return Err(RegistryError::DuplicateTrackInCup {
                        cup: cup.id,
                        track: track_id,
                    });
                }
                let track = self.tracks.get(&track_id).ok_or(RegistryError::MissingTrack {
                    cup: cup.id,
                    track: track_id,
                })?;
                if track.cup != cup.id {
                    return Err(RegistryError::CupMismatch {
                        track: track_id,
                        expected: track.cup,
                        found: cup.id,
                    });
                }
                listed.insert(track_id);
            }
        }

        let mut codes = HashSet::new();
        for track in self.tracks.values() {
            if !listed.contains(&track.id) {
                return Err(RegistryError::OrphanTrack(track.id));
            }
            if !codes.insert(track.code.as_str()) {
                return Err(RegistryError::DuplicateCode(track.code.clone()));
            }
            if let Some(reason) = track.status.violation() {
                return Err(RegistryError::InconsistentStatus {
                    track: track.id,
                    reason,
                });
            }
        }
        Ok(())
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    pub fn track_by_code(&self, code: &str) -> Option<&Track> {
        self.tracks.values().find(|track| track.code == code)
    }

    pub fn status(&self, id: TrackId) -> Option<TrackStatus> {
        self.tracks.get(&id).map(|track| track.status)
    }

    pub fn snapshot(&self, id: TrackId) -> Option<TrackSnapshot> {
        self.status(id).map(|status| TrackSnapshot::new(id, status))
    }

    pub fn cup(&self, id: CupId) -> Option<&Cup> {
        self.cups.get(&id)
    }

    pub fn cup_of(&self, track: TrackId) -> Option<&Cup> {
        self.tracks
            .get(&track)
            .and_then(|track| self.cups.get(&track.cup))
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Cups in display order.
    pub fn cups(&self) -> Vec<&Cup> {
        let mut cups: Vec<&Cup> = self.cups.values().collect();
        cups.sort_by_key(|cup| (cup.order, cup.id));
        cups
    }

    /// Snapshot of every track `player` currently owns.
    pub fn owned_by(&self, player: PlayerId) -> Vec<TrackSnapshot> {
        self.tracks
            .values()
            .filter(|track| track.status.is_owned_by(player))
            .map(|track| TrackSnapshot::new(track.id, track.status))
            .collect()
    }

    /// Tracks matching `filter`, ordered by cup order then position in cup.
    pub fn list(&self, filter: &TrackFilter) -> Vec<&Track> {
        let cup_id = match &filter.cup_code {
            Some(code) => match self.cups.values().find(|cup| &cup.code == code) {
                Some(cup) => Some(cup.id),
                None => return Vec::new(),
            },
            None => None,
        };

        let mut tracks: Vec<&Track> = self
            .tracks
            .values()
            .filter(|track| cup_id.is_none_or(|id| track.cup == id))
            .filter(|track| filter.owner.is_none_or(|owner| track.status.is_owned_by(owner)))
            .filter(|track| filter.state.is_none_or(|state| track.status.state == state))
            .collect();
        tracks.sort_by_key(|track| {
            let order = self.cups.get(&track.cup).map_or(u32::MAX, |cup| cup.order);
            (order, track.cup, track.position, track.id)
        });
        tracks
    }

    /// Overwrite one track's status. Returns `false` for unknown tracks.
    pub(crate) fn set_status(&mut self, id: TrackId, status: TrackStatus) -> bool {
        match self.tracks.get_mut(&id) {
            Some(track) => {
                track.status = status;
                true
            }
            None => false,
        }
    }

    pub(crate) fn apply(&mut self, snapshots: &[TrackSnapshot]) {
        for snapshot in snapshots {
            self.set_status(snapshot.track, snapshot.status);
        }
    }
}
