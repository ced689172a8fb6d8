//! The ledger: players plus every season's registry and log, behind a
//! single commit boundary.
//!
//! Each mutating operation reads current state, plans a [`Changeset`],
//! hands it to the [`Store`] and only then applies it in memory. A rejected
//! submission or a failed write leaves every season exactly as it was.

mod changeset;
mod error;

pub use changeset::Changeset;
pub use error::LedgerError;

use crate::config::LedgerConfig;
use crate::core::{
    Cup, EventId, Player, PlayerId, Season, SeasonId, SeasonStatus, Track, TrackId,
    TrackSnapshot, TrackStatus,
};
use crate::deactivation::plan_deactivation;
use crate::enforcement::{RaceContext, RaceRules, RaceSubmission};
use crate::journal::{verify_log, Event, EventDetail, EventFilter, EventLog, SideEffect};
use crate::machine::{apply_result, detect_sweep, Outcome};
use crate::registry::{TrackFilter, TrackRegistry};
use crate::store::{Ephemeral, Store};
use crate::undo::{plan_undo, UndoError, UndoSummary};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One season's current state and history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonBook {
    pub season: Season,
    pub registry: TrackRegistry,
    pub log: EventLog,
}

impl SeasonBook {
    /// Every player the season's tracks or log mention.
    pub fn referenced_players(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = Vec::new();
        let mut note = |status: &TrackStatus| {
            ids.extend(status.owner);
            ids.extend(status.threatened_by);
        };
        for track in self.registry.tracks() {
            note(&track.status);
        }
        for event in self.log.events() {
            for snapshot in event.pre.iter().chain(&event.post) {
                note(&snapshot.status);
            }
        }
        for event in self.log.events() {
            match &event.detail {
                EventDetail::RaceResult { winner, loser, .. } => {
                    ids.push(*winner);
                    ids.extend(*loser);
                }
                EventDetail::Sweep { owner, .. } => ids.push(*owner),
                EventDetail::PlayerDeactivation { player } => ids.push(*player),
            }
        }
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Data needed to open a season.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeasonSeed {
    pub id: SeasonId,
    pub label: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub cups: Vec<Cup>,
    /// Tracks with their opening status, usually unowned.
    pub tracks: Vec<Track>,
}

/// Result of an accepted race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceReceipt {
    pub event: EventId,
    pub outcome: Outcome,
    /// Sweep event recorded alongside the race, if the race completed a cup.
    pub sweep: Option<EventId>,
}

pub struct Ledger<S: Store = Ephemeral> {
    rules: RaceRules,
    players: BTreeMap<PlayerId, Player>,
    seasons: BTreeMap<SeasonId, SeasonBook>,
    store: S,
}

impl Ledger<Ephemeral> {
    /// In-memory ledger.
    pub fn new(rules: RaceRules) -> Self {
        Self::with_store(rules, Ephemeral)
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.race_rules())
    }
}

impl Default for Ledger<Ephemeral> {
    fn default() -> Self {
        Self::new(RaceRules::default())
    }
}

impl<S: Store> Ledger<S> {
    pub fn with_store(rules: RaceRules, store: S) -> Self {
        Self::from_parts(rules, BTreeMap::new(), BTreeMap::new(), store)
    }

    pub(crate) fn from_parts(
        rules: RaceRules,
        players: BTreeMap<PlayerId, Player>,
        seasons: BTreeMap<SeasonId, SeasonBook>,
        store: S,
    ) -> Self {
        Self {
            rules,
            players,
            seasons,
            store,
        }
    }

    pub fn rules(&self) -> &RaceRules {
        &self.rules
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn season(&self, id: SeasonId) -> Option<&SeasonBook> {
        self.seasons.get(&id)
    }

    pub fn seasons(&self) -> impl Iterator<Item = &Season> {
        self.seasons.values().map(|book| &book.season)
    }

    /// The one season that is not archived, if any. Only it accepts
    /// mutations; player activity is global, so two open seasons could
    /// leave an inactive player owning tracks in one of them.
    pub fn current_season(&self) -> Option<SeasonId> {
        self.seasons
            .values()
            .find(|book| !book.season.is_archived())
            .map(|book| book.season.id)
    }

    /// The open season whose date range covers `date`.
    pub fn active_season_on(&self, date: NaiveDate) -> Option<SeasonId> {
        self.seasons
            .values()
            .map(|book| &book.season)
            .find(|season| !season.is_archived() && season.covers(date))
            .map(|season| season.id)
    }

    pub fn register_player(&mut self, name: impl Into<String>) -> Result<PlayerId, LedgerError> {
        let name = name.into().trim().to_string();
        if self
            .players
            .values()
            .any(|player| player.name.eq_ignore_ascii_case(&name))
        {
            return Err(LedgerError::DuplicatePlayer(name));
        }
        let id = PlayerId(self.players.keys().next_back().map_or(1, |last| last.get() + 1));
        let player = Player::new(id, name);

        self.store.put_player(&player)?;
        tracing::info!(player = %id, name = %player.name, "Player registered");
        self.players.insert(id, player);
        Ok(id)
    }

    /// Open a new season from a seed. The seed's cups and tracks are
    /// validated as a whole before anything is stored.
    pub fn open_season(&mut self, seed: SeasonSeed) -> Result<SeasonId, LedgerError> {
        if self.seasons.contains_key(&seed.id) {
            return Err(LedgerError::DuplicateSeason(seed.id));
        }
        self.check_nothing_open(seed.id)?;
        let registry = TrackRegistry::new(seed.cups, seed.tracks)?;
        check_owners(seed.id, &registry, &self.players)?;

        let book = SeasonBook {
            season: Season {
                id: seed.id,
                label: seed.label,
                starts_on: seed.starts_on,
                ends_on: seed.ends_on,
                status: SeasonStatus::Active,
            },
            registry,
            log: EventLog::new(),
        };
        self.store.put_season(&book, &[])?;
        tracing::info!(
            season = %seed.id,
            label = %book.season.label,
            tracks = book.registry.tracks().count(),
            "Season opened"
        );
        self.seasons.insert(seed.id, book);
        Ok(seed.id)
    }

    /// Add a season carried over from elsewhere, with its full history.
    /// Players it mentions that this ledger does not know are added as-is.
    /// An open season is only accepted while every other season is archived.
    pub fn import_season(
        &mut self,
        book: SeasonBook,
        players: &[Player],
    ) -> Result<SeasonId, LedgerError> {
        let id = book.season.id;
        if self.seasons.contains_key(&id) {
            return Err(LedgerError::DuplicateSeason(id));
        }
        if !book.season.is_archived() {
            self.check_nothing_open(id)?;
        }
        book.registry.verify()?;
        verify_log(id, &book.log, &book.registry)?;

        let newcomers: Vec<Player> = players
            .iter()
            .filter(|player| !self.players.contains_key(&player.id))
            .cloned()
            .collect();
        let mut known = self.players.clone();
        known.extend(newcomers.iter().map(|player| (player.id, player.clone())));
        if let Some(unknown) = book
            .referenced_players()
            .into_iter()
            .find(|player| !known.contains_key(player))
        {
            return Err(LedgerError::UnknownPlayer(unknown));
        }
        if !book.season.is_archived() {
            check_owners(id, &book.registry, &known)?;
        }

        self.store.put_season(&book, &newcomers)?;
        tracing::info!(
            season = %id,
            events = book.log.len(),
            players_added = newcomers.len(),
            "Season imported"
        );
        self.players = known;
        self.seasons.insert(id, book);
        Ok(id)
    }

    /// Freeze a season. Reads keep working; every mutation is refused.
    pub fn archive_season(&mut self, season: SeasonId) -> Result<(), LedgerError> {
        self.open_book(season)?;
        self.store.set_season_status(season, SeasonStatus::Archived)?;
        if let Some(book) = self.seasons.get_mut(&season) {
            book.season.status = SeasonStatus::Archived;
        }
        tracing::info!(season = %season, "Season archived");
        Ok(())
    }

    /// Apply one race result to its track.
    ///
    /// The submission is admitted by the race rules first; a short race is
    /// refused with `InsufficientRacers` and nothing is recorded. When the
    /// result completes a cup for its new owner, a sweep event chained to
    /// the race is recorded in the same commit.
    pub fn submit_race_result(
        &mut self,
        season: SeasonId,
        submission: RaceSubmission,
    ) -> Result<RaceReceipt, LedgerError> {
        let book = self.open_book(season)?;
        let track = book
            .registry
            .track(submission.track)
            .ok_or(LedgerError::UnknownTrack {
                season,
                track: submission.track,
            })?;

        let context = RaceContext {
            submission: &submission,
            track,
            players: &self.players,
        };
        let outcome = self
            .rules
            .admit(&context)
            .and_then(|()| {
                apply_result(
                    &track.status,
                    submission.winner,
                    context.racer_count(),
                    submission.loser,
                    self.rules.transition_rules(),
                )
            })
            .map_err(|err| {
                tracing::warn!(
                    season = %season,
                    track = %track.code,
                    winner = %submission.winner,
                    error = %err,
                    "Race result rejected"
                );
                err
            })?;

        let at = Utc::now();
        let race_id = book.log.next_id();
        let mut changes = Changeset::new(season, at);
        changes.tracks.push(TrackSnapshot::new(track.id, outcome.after));
        changes.appended.push(Event {
            id: race_id,
            season,
            occurred_at: at,
            detail: EventDetail::RaceResult {
                track: track.id,
                winner: submission.winner,
                loser: submission.loser,
                racer_count: context.racer_count(),
                transition: outcome.kind,
            },
            pre: vec![TrackSnapshot::new(track.id, outcome.before)],
            post: vec![TrackSnapshot::new(track.id, outcome.after)],
            side_effects: None,
            reversed_at: None,
        });
        tracing::debug!(
            season = %season,
            track = %track.code,
            transition = %outcome.kind,
            before = %outcome.before,
            after = %outcome.after,
            "Race planned"
        );

        let sweep = book.registry.cup(track.cup).and_then(|cup| {
            detect_sweep(cup, track.id, &outcome, |id| book.registry.status(id))
        });
        let sweep_id = sweep.map(|effect| {
            let id = EventId(race_id.get() + 1);
            let after = effect.after();
            changes.tracks.extend(after);
            changes.appended.push(Event {
                id,
                season,
                occurred_at: at,
                detail: EventDetail::Sweep {
                    cup: effect.cup,
                    owner: effect.owner,
                    caused_by: race_id,
                },
                pre: effect.before.to_vec(),
                post: after.to_vec(),
                side_effects: Some(SideEffect::SweepLock(effect.before)),
                reversed_at: None,
            });
            id
        });
        let code = track.code.clone();

        self.commit(changes)?;
        tracing::info!(
            season = %season,
            track = %code,
            event = %race_id,
            transition = %outcome.kind,
            "Race result recorded"
        );
        if let (Some(id), Some(effect)) = (sweep_id, sweep) {
            tracing::info!(
                season = %season,
                cup = %effect.cup,
                owner = %effect.owner,
                event = %id,
                caused_by = %race_id,
                "Cup swept"
            );
        }

        Ok(RaceReceipt {
            event: race_id,
            outcome,
            sweep: sweep_id,
        })
    }

    /// Deactivate a player and release every track they own in `season`.
    pub fn submit_deactivation(
        &mut self,
        season: SeasonId,
        player: PlayerId,
    ) -> Result<EventId, LedgerError> {
        let book = self.open_book(season)?;
        let release = plan_deactivation(&book.registry, &self.players, player).map_err(|err| {
            tracing::warn!(season = %season, player = %player, error = %err, "Deactivation rejected");
            err
        })?;

        let at = Utc::now();
        let id = book.log.next_id();
        let released = release.released.len();
        let mut changes = Changeset::new(season, at);
        changes.tracks = release.after();
        changes.players.push((player, false));
        changes.appended.push(release.into_event(id, season, at));

        self.commit(changes)?;
        tracing::info!(
            season = %season,
            player = %player,
            event = %id,
            released,
            "Player deactivated"
        );
        Ok(id)
    }

    /// Undo the newest live event of `season`.
    pub fn request_undo(&mut self, season: SeasonId) -> Result<UndoSummary, LedgerError> {
        let book = self.open_book(season)?;
        let plan = plan_undo(season, &book.log, &book.registry).map_err(|err| {
            if !matches!(err, UndoError::InconsistentSnapshot { .. }) {
                tracing::warn!(season = %season, error = %err, "Undo rejected");
            }
            err
        })?;

        let mut changes = Changeset::new(season, Utc::now());
        changes.tracks = plan.writes;
        if let Some(player) = plan.summary.reactivated {
            changes.players.push((player, true));
        }
        changes.reversed = plan.summary.reverted.clone();
        tracing::debug!(
            season = %season,
            writes = changes.tracks.len(),
            reversed = changes.reversed.len(),
            "Undo planned"
        );

        self.commit(changes)?;
        tracing::info!(
            season = %season,
            kind = %plan.summary.kind,
            reverted = ?plan.summary.reverted,
            "Event undone"
        );
        Ok(plan.summary)
    }

    pub fn get_track_state(
        &self,
        season: SeasonId,
        track: TrackId,
    ) -> Result<TrackSnapshot, LedgerError> {
        self.book(season)?
            .registry
            .snapshot(track)
            .ok_or(LedgerError::UnknownTrack { season, track })
    }

    pub fn list_tracks(
        &self,
        season: SeasonId,
        filter: &TrackFilter,
    ) -> Result<Vec<&Track>, LedgerError> {
        Ok(self.book(season)?.registry.list(filter))
    }

    pub fn list_events(
        &self,
        season: SeasonId,
        filter: &EventFilter,
    ) -> Result<Vec<&Event>, LedgerError> {
        Ok(self.book(season)?.log.list(filter))
    }

    fn book(&self, season: SeasonId) -> Result<&SeasonBook, LedgerError> {
        self.seasons
            .get(&season)
            .ok_or(LedgerError::UnknownSeason(season))
    }

    fn open_book(&self, season: SeasonId) -> Result<&SeasonBook, LedgerError> {
        let book = self.book(season)?;
        if book.season.is_archived() {
            tracing::warn!(season = %season, "Mutation refused on archived season");
            return Err(LedgerError::SeasonArchived(season));
        }
        Ok(book)
    }

    fn check_nothing_open(&self, requested: SeasonId) -> Result<(), LedgerError> {
        match self.current_season() {
            Some(open) => {
                tracing::warn!(open = %open, requested = %requested, "Season still open");
                Err(LedgerError::SeasonStillOpen { open, requested })
            }
            None => Ok(()),
        }
    }

    /// Persist `changes`, then apply them in memory.
    fn commit(&mut self, changes: Changeset) -> Result<(), LedgerError> {
        if !self.seasons.contains_key(&changes.season) {
            return Err(LedgerError::UnknownSeason(changes.season));
        }
        if let Err(err) = self.store.commit(&changes) {
            tracing::error!(season = %changes.season, error = %err, "Commit failed");
            return Err(err.into());
        }

        for (player, active) in &changes.players {
            if let Some(record) = self.players.get_mut(player) {
                record.active = *active;
            }
        }
        if let Some(book) = self.seasons.get_mut(&changes.season) {
            book.registry.apply(&changes.tracks);
            for event in changes.appended {
                book.log.push(event);
            }
            for id in &changes.reversed {
                book.log.mark_reversed(*id, changes.at);
            }
        }
        Ok(())
    }
}

/// Every owner or hunter must be a known player, and every owner active.
fn check_owners(
    season: SeasonId,
    registry: &TrackRegistry,
    players: &BTreeMap<PlayerId, Player>,
) -> Result<(), LedgerError> {
    for track in registry.tracks() {
        for player in [track.status.owner, track.status.threatened_by]
            .into_iter()
            .flatten()
        {
            if !players.contains_key(&player) {
                return Err(LedgerError::UnknownPlayer(player));
            }
        }
        if let Some(owner) = track.status.owner {
            if players.get(&owner).is_some_and(|player| !player.active) {
                return Err(LedgerError::InactiveOwner { season, player: owner });
            }
        }
    }
    Ok(())
}
