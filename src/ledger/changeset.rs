//! Atomic unit of change for one season.

use crate::core::{EventId, PlayerId, SeasonId, TrackSnapshot};
use crate::journal::Event;
use chrono::{DateTime, Utc};

/// Everything one operation writes, planned before anything is written.
///
/// A store persists the whole changeset or none of it; only after that
/// succeeds is it applied to memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Changeset {
    pub season: SeasonId,
    pub at: DateTime<Utc>,
    /// Track writes in application order; later entries win.
    pub tracks: Vec<TrackSnapshot>,
    /// Player activity flags to set.
    pub players: Vec<(PlayerId, bool)>,
    pub appended: Vec<Event>,
    pub reversed: Vec<EventId>,
}

impl Changeset {
    pub fn new(season: SeasonId, at: DateTime<Utc>) -> Self {
        Self {
            season,
            at,
            tracks: Vec::new(),
            players: Vec::new(),
            appended: Vec::new(),
            reversed: Vec::new(),
        }
    }

    /// Final value of every written track, one entry per track.
    pub fn final_tracks(&self) -> Vec<TrackSnapshot> {
        let mut out: Vec<TrackSnapshot> = Vec::with_capacity(self.tracks.len());
        for write in &self.tracks {
            match out.iter_mut().find(|s| s.track == write.track) {
                Some(existing) => existing.status = write.status,
                None => out.push(*write),
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
            && self.players.is_empty()
            && self.appended.is_empty()
            && self.reversed.is_empty()
    }
}
