//! Identity newtypes.
//!
//! Events refer to tracks, cups, players and seasons by identity only, so
//! every id is a small `Copy` value that serializes as its inner integer.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw integer value, as stored in the persistence layer.
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identity of a track within a season.
    TrackId,
    "track#"
);
id_type!(
    /// Identity of a cup (a group of exactly four tracks).
    CupId,
    "cup#"
);
id_type!(
    /// Identity of a player. Players are shared across seasons.
    PlayerId,
    "player#"
);
id_type!(
    /// Identity of a season.
    SeasonId,
    "season#"
);
id_type!(
    /// Sequential event identity. Never reused, even after an undo.
    EventId,
    "event#"
);
