//! Trackward: track ownership ledger with single-level undo
//!
//! Trackward keeps the ownership state of every track in a season and the
//! log of events that produced it. The transition rules are pure functions;
//! persistence sits behind a single commit boundary in the ledger.
//!
//! # Core Concepts
//!
//! - **Track state**: each track is unowned, owned, locked, or at risk with a hunter
//! - **Transitions**: a race result moves a track through a fixed table
//! - **Sweeps**: owning all four tracks of a cup locks the whole cup
//! - **Events**: every mutation is logged with before and after snapshots
//! - **Undo**: the newest live event can be reversed, one step at a time
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trackward::core::{Cup, CupId, DisplayNames, SeasonId, Track, TrackId, TrackState, TrackStatus};
//! use trackward::enforcement::{RaceRules, RaceSubmission, Racers};
//! use trackward::ledger::{Ledger, SeasonSeed};
//!
//! let mut ledger = Ledger::new(RaceRules::default());
//! let ana = ledger.register_player("Ana")?;
//! let beto = ledger.register_player("Beto")?;
//!
//! let cup = Cup {
//!     id: CupId(1),
//!     code: "MUSH".into(),
//!     order: 1,
//!     names: DisplayNames::new("Mushroom Cup"),
//!     tracks: [TrackId(1), TrackId(2), TrackId(3), TrackId(4)],
//! };
//! let tracks = cup
//!     .tracks
//!     .iter()
//!     .zip(1u8..)
//!     .map(|(&id, position)| Track {
//!         id,
//!         code: format!("MU{position}"),
//!         cup: cup.id,
//!         position,
//!         names: DisplayNames::new(format!("Course {position}")),
//!         status: TrackStatus::unowned(),
//!     })
//!     .collect();
//! let season = ledger.open_season(SeasonSeed {
//!     id: SeasonId(1),
//!     label: "Spring".into(),
//!     starts_on: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
//!     ends_on: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
//!     cups: vec![cup],
//!     tracks,
//! })?;
//!
//! ledger.submit_race_result(season, RaceSubmission::new(TrackId(1), ana, Racers::Count(4)))?;
//! ledger.submit_race_result(season, RaceSubmission::new(TrackId(1), beto, Racers::Count(4)))?;
//! assert_eq!(ledger.get_track_state(season, TrackId(1))?.status.state, TrackState::AtRisk);
//!
//! ledger.request_undo(season)?;
//! assert_eq!(ledger.get_track_state(season, TrackId(1))?.status, TrackStatus::owned(ana));
//! # Ok::<(), trackward::ledger::LedgerError>(())
//! ```

pub mod checkpoint;
pub mod config;
pub mod core;
pub mod deactivation;
pub mod enforcement;
pub mod journal;
pub mod ledger;
pub mod machine;
pub mod registry;
pub mod store;
pub mod undo;

// Re-export commonly used types
pub use config::LedgerConfig;
pub use core::{PlayerId, SeasonId, TrackId, TrackState, TrackStatus};
pub use enforcement::{RaceSubmission, Racers};
pub use ledger::{Ledger, LedgerError};
