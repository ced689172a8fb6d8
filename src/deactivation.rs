//! Player deactivation: release every track the player owns in a season.

use crate::core::{EventId, Player, PlayerId, SeasonId, TrackSnapshot, TrackStatus};
use crate::journal::{Event, EventDetail, SideEffect};
use crate::registry::TrackRegistry;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeactivationError {
    #[error("Unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("Player {0} is already inactive")]
    PlayerInactive(PlayerId),
}

/// Tracks a deactivation will hand back, captured before anything changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Release {
    pub player: PlayerId,
    /// Owned tracks as they stand now, whatever their state.
    pub released: Vec<TrackSnapshot>,
}

impl Release {
    /// The same tracks, unowned.
    pub fn after(&self) -> Vec<TrackSnapshot> {
        self.released
            .iter()
            .map(|snapshot| TrackSnapshot::new(snapshot.track, TrackStatus::unowned()))
            .collect()
    }

    /// Build the log entry for this release. The side-effect payload holds
    /// every released snapshot so undo can put them back verbatim.
    pub fn into_event(self, id: EventId, season: SeasonId, at: DateTime<Utc>) -> Event {
        let post = self.after();
        Event {
            id,
            season,
            occurred_at: at,
            detail: EventDetail::PlayerDeactivation {
                player: self.player,
            },
            pre: self.released.clone(),
            post,
            side_effects: Some(SideEffect::DeactivationRelease(self.released)),
            reversed_at: None,
        }
    }
}

/// Plan the deactivation of `player`.
///
/// Hunter marks the player holds on other owners' tracks are left alone;
/// only ownership is released.
pub fn plan_deactivation(
    registry: &TrackRegistry,
    players: &BTreeMap<PlayerId, Player>,
    player: PlayerId,
) -> Result<Release, DeactivationError> {
    let record = players
        .get(&player)
        .ok_or(DeactivationError::UnknownPlayer(player))?;
    if !record.active {
        return Err(DeactivationError::PlayerInactive(player));
    }
    Ok(Release {
        player,
        released: registry.owned_by(player),
    })
}
