//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use trackward::core::{Cup, CupId, DisplayNames, PlayerId, SeasonId, Track, TrackId, TrackStatus};
use trackward::enforcement::{RaceRules, RaceSubmission, Racers};
use trackward::ledger::{Ledger, SeasonSeed};
use trackward::store::Store;

pub const SEASON: SeasonId = SeasonId(1);

/// Id of track `n` (1-4) of cup `cup`.
pub fn track_id(cup: u64, n: u64) -> TrackId {
    TrackId(cup * 10 + n)
}

pub fn cup_tracks(cup: u64) -> [TrackId; 4] {
    [1, 2, 3, 4].map(|n| track_id(cup, n))
}

/// A season with `cups` cups of four unowned tracks each.
pub fn seed(season: SeasonId, cups: u64) -> SeasonSeed {
    let mut cup_list = Vec::new();
    let mut tracks = Vec::new();
    for c in 1..=cups {
        let cup = Cup {
            id: CupId(c),
            code: format!("CUP{c}"),
            order: c as u32,
            names: DisplayNames::new(format!("Cup {c}")).with("es", format!("Copa {c}")),
            tracks: cup_tracks(c),
        };
        for (position, id) in (1u8..).zip(cup.tracks) {
            tracks.push(Track {
                id,
                code: format!("C{c}T{position}"),
                cup: cup.id,
                position,
                names: DisplayNames::new(format!("Track {c}.{position}")),
                status: TrackStatus::unowned(),
            });
        }
        cup_list.push(cup);
    }
    SeasonSeed {
        id: season,
        label: format!("Season {}", season.get()),
        starts_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        ends_on: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        cups: cup_list,
        tracks,
    }
}

/// Register `names` and open [`SEASON`] with `cups` cups.
pub fn populate<S: Store>(ledger: &mut Ledger<S>, names: &[&str], cups: u64) -> Vec<PlayerId> {
    let players = names
        .iter()
        .map(|name| ledger.register_player(*name).unwrap())
        .collect();
    ledger.open_season(seed(SEASON, cups)).unwrap();
    players
}

pub fn ledger(names: &[&str], cups: u64) -> (Ledger, Vec<PlayerId>) {
    let mut ledger = Ledger::new(RaceRules::default());
    let players = populate(&mut ledger, names, cups);
    (ledger, players)
}

pub fn race(track: TrackId, winner: PlayerId, racers: u32) -> RaceSubmission {
    RaceSubmission::new(track, winner, Racers::Count(racers))
}

pub fn status<S: Store>(ledger: &Ledger<S>, track: TrackId) -> TrackStatus {
    ledger.get_track_state(SEASON, track).unwrap().status
}
