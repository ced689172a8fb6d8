//! SQLite-backed store.
//!
//! Track state is kept in columns (`state` uses 1 = locked, 0 = default,
//! -1 = at risk) so the table can enforce the hunter invariant itself.
//! Event snapshots are JSON blobs.

use super::{Store, StoreError};
use crate::config::LedgerConfig;
use crate::core::{
    Cup, CupId, DisplayNames, EventId, Player, PlayerId, Season, SeasonId, SeasonStatus, Track,
    TrackId, TrackState, TrackStatus, CUP_SIZE,
};
use crate::enforcement::RaceRules;
use crate::journal::{verify_log, Event, EventLog};
use crate::ledger::{Changeset, Ledger, SeasonBook};
use crate::registry::TrackRegistry;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;
    BEGIN;
    CREATE TABLE IF NOT EXISTS players (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 1
    );
    CREATE TABLE IF NOT EXISTS seasons (
        id INTEGER PRIMARY KEY,
        label TEXT NOT NULL,
        starts_on TEXT NOT NULL,
        ends_on TEXT NOT NULL,
        archived INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS cups (
        season_id INTEGER NOT NULL REFERENCES seasons(id),
        id INTEGER NOT NULL,
        code TEXT NOT NULL,
        display_order INTEGER NOT NULL,
        names TEXT NOT NULL,
        tracks TEXT NOT NULL,
        PRIMARY KEY (season_id, id),
        UNIQUE (season_id, code)
    );
    CREATE TABLE IF NOT EXISTS tracks (
        season_id INTEGER NOT NULL REFERENCES seasons(id),
        id INTEGER NOT NULL,
        code TEXT NOT NULL,
        cup_id INTEGER NOT NULL,
        position INTEGER NOT NULL,
        names TEXT NOT NULL,
        state INTEGER NOT NULL DEFAULT 0 CHECK (state IN (-1, 0, 1)),
        owner_id INTEGER REFERENCES players(id),
        threatened_by_id INTEGER REFERENCES players(id),
        PRIMARY KEY (season_id, id),
        UNIQUE (season_id, code),
        FOREIGN KEY (season_id, cup_id) REFERENCES cups(season_id, id),
        CHECK ((threatened_by_id IS NOT NULL) = (state = -1))
    );
    CREATE TABLE IF NOT EXISTS events (
        season_id INTEGER NOT NULL REFERENCES seasons(id),
        id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        occurred_at TEXT NOT NULL,
        detail TEXT NOT NULL,
        pre TEXT NOT NULL,
        post TEXT NOT NULL,
        side_effects TEXT,
        reversed_at TEXT,
        PRIMARY KEY (season_id, id)
    );
    CREATE INDEX IF NOT EXISTS idx_events_live ON events (season_id, reversed_at);
    COMMIT;";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Rebuild a ledger from everything stored. Each season's registry and
    /// log are verified before the ledger is handed back.
    pub fn load(self, rules: RaceRules) -> Result<Ledger<SqliteStore>, StoreError> {
        let players = self.load_players()?;
        let stored = self.load_seasons()?;
        let open: Vec<SeasonId> = stored
            .iter()
            .filter(|season| !season.is_archived())
            .map(|season| season.id)
            .collect();
        if open.len() > 1 {
            return Err(StoreError::Corrupt(format!(
                "more than one open season: {open:?}"
            )));
        }
        let mut seasons = BTreeMap::new();
        for season in stored {
            let registry = TrackRegistry::new(
                self.load_cups(season.id)?,
                self.load_tracks(season.id)?,
            )?;
            let mut log = EventLog::new();
            for event in self.load_events(season.id)? {
                log.push(event);
            }
            verify_log(season.id, &log, &registry)?;
            tracing::debug!(season = %season.id, events = log.len(), "Season loaded");
            seasons.insert(
                season.id,
                SeasonBook {
                    season,
                    registry,
                    log,
                },
            );
        }
        tracing::info!(
            players = players.len(),
            seasons = seasons.len(),
            "Ledger loaded from SQLite"
        );
        Ok(Ledger::from_parts(rules, players, seasons, self))
    }

    fn load_players(&self) -> Result<BTreeMap<PlayerId, Player>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, active FROM players ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Player {
                id: PlayerId(row.get::<_, i64>(0)? as u64),
                name: row.get(1)?,
                active: row.get(2)?,
            })
        })?;
        let mut players = BTreeMap::new();
        for row in rows {
            let player = row?;
            players.insert(player.id, player);
        }
        Ok(players)
    }

    fn load_seasons(&self) -> Result<Vec<Season>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, label, starts_on, ends_on, archived FROM seasons ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;
        let mut seasons = Vec::new();
        for row in rows {
            let (id, label, starts_on, ends_on, archived) = row?;
            seasons.push(Season {
                id: SeasonId(id as u64),
                label,
                starts_on: parse_date(&starts_on)?,
                ends_on: parse_date(&ends_on)?,
                status: if archived {
                    SeasonStatus::Archived
                } else {
                    SeasonStatus::Active
                },
            });
        }
        Ok(seasons)
    }

    fn load_cups(&self, season: SeasonId) -> Result<Vec<Cup>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, display_order, names, tracks FROM cups
             WHERE season_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![sql_id(season.get())], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut cups = Vec::new();
        for row in rows {
            let (id, code, order, names, tracks) = row?;
            let tracks: [TrackId; CUP_SIZE] = serde_json::from_str(&tracks)?;
            cups.push(Cup {
                id: CupId(id as u64),
                code,
                order: u32::try_from(order)
                    .map_err(|_| StoreError::Corrupt(format!("cup order {order}")))?,
                names: serde_json::from_str(&names)?,
                tracks,
            });
        }
        Ok(cups)
    }

    fn load_tracks(&self, season: SeasonId) -> Result<Vec<Track>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, cup_id, position, names, state, owner_id, threatened_by_id
             FROM tracks WHERE season_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![sql_id(season.get())], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, Option<i64>>(7)?,
            ))
        })?;
        let mut tracks = Vec::new();
        for row in rows {
            let (id, code, cup, position, names, state, owner, hunter) = row?;
            let state = TrackState::from_code(state)
                .ok_or_else(|| StoreError::Corrupt(format!("track {code} has state {state}")))?;
            let names: DisplayNames = serde_json::from_str(&names)?;
            tracks.push(Track {
                id: TrackId(id as u64),
                position: u8::try_from(position)
                    .map_err(|_| StoreError::Corrupt(format!("track {code} position {position}")))?,
                code,
                cup: CupId(cup as u64),
                names,
                status: TrackStatus {
                    state,
                    owner: owner.map(|id| PlayerId(id as u64)),
                    threatened_by: hunter.map(|id| PlayerId(id as u64)),
                },
            });
        }
        Ok(tracks)
    }

    fn load_events(&self, season: SeasonId) -> Result<Vec<Event>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, occurred_at, detail, pre, post, side_effects, reversed_at
             FROM events WHERE season_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![sql_id(season.get())], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;
        let mut events = Vec::new();
        for row in rows {
            let (id, occurred_at, detail, pre, post, side_effects, reversed_at) = row?;
            events.push(Event {
                id: EventId(id as u64),
                season,
                occurred_at: parse_time(&occurred_at)?,
                detail: serde_json::from_str(&detail)?,
                pre: serde_json::from_str(&pre)?,
                post: serde_json::from_str(&post)?,
                side_effects: side_effects
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()?,
                reversed_at: reversed_at.as_deref().map(parse_time).transpose()?,
            });
        }
        Ok(events)
    }
}

impl Store for SqliteStore {
    fn put_player(&mut self, player: &Player) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO players (id, name, active) VALUES (?1, ?2, ?3)",
            params![sql_id(player.id.get()), player.name, player.active],
        )?;
        Ok(())
    }

    fn put_season(&mut self, book: &SeasonBook, players: &[Player]) -> Result<(), StoreError> {
        let season = &book.season;
        let season_id = sql_id(season.id.get());
        let tx = self.conn.transaction()?;

        for player in players {
            tx.execute(
                "INSERT OR IGNORE INTO players (id, name, active) VALUES (?1, ?2, ?3)",
                params![sql_id(player.id.get()), player.name, player.active],
            )?;
        }
        tx.execute(
            "INSERT INTO seasons (id, label, starts_on, ends_on, archived)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                season_id,
                season.label,
                season.starts_on.to_string(),
                season.ends_on.to_string(),
                season.is_archived()
            ],
        )?;
        for cup in book.registry.cups() {
            tx.execute(
                "INSERT INTO cups (season_id, id, code, display_order, names, tracks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    season_id,
                    sql_id(cup.id.get()),
                    cup.code,
                    cup.order,
                    serde_json::to_string(&cup.names)?,
                    serde_json::to_string(&cup.tracks)?
                ],
            )?;
        }
        for track in book.registry.tracks() {
            tx.execute(
                "INSERT INTO tracks
                 (season_id, id, code, cup_id, position, names, state, owner_id, threatened_by_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    season_id,
                    sql_id(track.id.get()),
                    track.code,
                    sql_id(track.cup.get()),
                    track.position,
                    serde_json::to_string(&track.names)?,
                    track.status.state.code(),
                    track.status.owner.map(|id| sql_id(id.get())),
                    track.status.threatened_by.map(|id| sql_id(id.get()))
                ],
            )?;
        }
        for event in book.log.events() {
            insert_event(&tx, season_id, event)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn set_season_status(
        &mut self,
        season: SeasonId,
        status: SeasonStatus,
    ) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE seasons SET archived = ?1 WHERE id = ?2",
            params![status == SeasonStatus::Archived, sql_id(season.get())],
        )?;
        expect_one(updated, || format!("season {season} is not stored"))
    }

    fn commit(&mut self, changes: &Changeset) -> Result<(), StoreError> {
        let season = sql_id(changes.season.get());
        let tx = self.conn.transaction()?;

        for snapshot in changes.final_tracks() {
            let status = snapshot.status;
            let updated = tx.execute(
                "UPDATE tracks SET state = ?1, owner_id = ?2, threatened_by_id = ?3
                 WHERE season_id = ?4 AND id = ?5",
                params![
                    status.state.code(),
                    status.owner.map(|id| sql_id(id.get())),
                    status.threatened_by.map(|id| sql_id(id.get())),
                    season,
                    sql_id(snapshot.track.get())
                ],
            )?;
            expect_one(updated, || format!("track {} is not stored", snapshot.track))?;
        }
        for (player, active) in &changes.players {
            let updated = tx.execute(
                "UPDATE players SET active = ?1 WHERE id = ?2",
                params![active, sql_id(player.get())],
            )?;
            expect_one(updated, || format!("player {player} is not stored"))?;
        }
        for event in &changes.appended {
            insert_event(&tx, season, event)?;
        }
        let at = changes.at.to_rfc3339();
        for id in &changes.reversed {
            let updated = tx.execute(
                "UPDATE events SET reversed_at = ?1
                 WHERE season_id = ?2 AND id = ?3 AND reversed_at IS NULL",
                params![at, season, sql_id(id.get())],
            )?;
            expect_one(updated, || format!("event {id} is not a live stored event"))?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Open the ledger `config` points at: its SQLite file, or a fresh
/// in-memory database when no path is set.
pub fn open_ledger(config: &LedgerConfig) -> Result<Ledger<SqliteStore>, StoreError> {
    let store = match &config.database_path {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_in_memory()?,
    };
    store.load(config.race_rules())
}

fn insert_event(conn: &Connection, season: i64, event: &Event) -> Result<(), StoreError> {
    let side_effects = event
        .side_effects
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        "INSERT INTO events
         (season_id, id, kind, occurred_at, detail, pre, post, side_effects, reversed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            season,
            sql_id(event.id.get()),
            event.kind().name(),
            event.occurred_at.to_rfc3339(),
            serde_json::to_string(&event.detail)?,
            serde_json::to_string(&event.pre)?,
            serde_json::to_string(&event.post)?,
            side_effects,
            event.reversed_at.map(|at| at.to_rfc3339())
        ],
    )?;
    Ok(())
}

fn expect_one<F>(updated: usize, describe: F) -> Result<(), StoreError>
where
    F: FnOnce() -> String,
{
    if updated == 1 {
        Ok(())
    } else {
        Err(StoreError::Corrupt(describe()))
    }
}

/// SQLite integers are signed; ids are stored bit-for-bit.
fn sql_id(id: u64) -> i64 {
    id as i64
}

fn parse_date(raw: &str) -> Result<NaiveDate, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("bad date {raw:?}")))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt(format!("bad timestamp {raw:?}")))
}
