//! Race submissions and the context handed to race checks.

use crate::core::{Player, PlayerId, Track, TrackId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who took part in a race: either just a head count or the full roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Racers {
    Count(u32),
    Roster(Vec<PlayerId>),
}

impl Racers {
    pub fn count(&self) -> u32 {
        match self {
            Self::Count(n) => *n,
            Self::Roster(ids) => u32::try_from(ids.len()).unwrap_or(u32::MAX),
        }
    }

    pub fn roster(&self) -> Option<&[PlayerId]> {
        match self {
            Self::Count(_) => None,
            Self::Roster(ids) => Some(ids),
        }
    }
}

/// A race result as submitted by the routing layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceSubmission {
    pub track: TrackId,
    pub winner: PlayerId,
    pub racers: Racers,
    pub loser: Option<PlayerId>,
}

impl RaceSubmission {
    pub fn new(track: TrackId, winner: PlayerId, racers: Racers) -> Self {
        Self {
            track,
            winner,
            racers,
            loser: None,
        }
    }

    pub fn with_loser(mut self, loser: PlayerId) -> Self {
        self.loser = Some(loser);
        self
    }
}

/// Everything a race check may look at.
#[derive(Clone, Copy, Debug)]
pub struct RaceContext<'a> {
    pub submission: &'a RaceSubmission,
    pub track: &'a Track,
    pub players: &'a BTreeMap<PlayerId, Player>,
}

impl<'a> RaceContext<'a> {
    pub fn player(&self, id: PlayerId) -> Option<&'a Player> {
        self.players.get(&id)
    }

    pub fn racer_count(&self) -> u32 {
        self.submission.racers.count()
    }
}
