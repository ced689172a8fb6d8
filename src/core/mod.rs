//! Core data model.
//!
//! Identities, the track state triple and the seeded entities. Everything
//! here is plain data; transitions live in [`crate::machine`].

mod ids;
mod model;
mod state;

pub use ids::{CupId, EventId, PlayerId, SeasonId, TrackId};
pub use model::{Cup, DisplayNames, Player, Season, SeasonStatus, Track, CUP_SIZE};
pub use state::{TrackSnapshot, TrackState, TrackStatus};
