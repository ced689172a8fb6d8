//! Event records and the snapshot payloads they carry.

use crate::core::{CupId, EventId, PlayerId, SeasonId, TrackId, TrackSnapshot, CUP_SIZE};
use crate::machine::TransitionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    RaceResult,
    Sweep,
    PlayerDeactivation,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RaceResult => "race",
            Self::Sweep => "sweep",
            Self::PlayerDeactivation => "deactivation",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "race" | "race_result" | "raceresult" => Some(Self::RaceResult),
            "sweep" => Some(Self::Sweep),
            "deactivation" | "player_deactivation" => Some(Self::PlayerDeactivation),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-specific references carried by an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventDetail {
    RaceResult {
        track: TrackId,
        winner: PlayerId,
        loser: Option<PlayerId>,
        racer_count: u32,
        transition: TransitionKind,
    },
    /// Lock of a whole cup, chained to the race that completed it.
    Sweep {
        cup: CupId,
        owner: PlayerId,
        caused_by: EventId,
    },
    PlayerDeactivation { player: PlayerId },
}

impl EventDetail {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::RaceResult { .. } => EventKind::RaceResult,
            Self::Sweep { .. } => EventKind::Sweep,
            Self::PlayerDeactivation { .. } => EventKind::PlayerDeactivation,
        }
    }
}

/// Secondary track changes caused by an event, as pre-change snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideEffect {
    SweepLock([TrackSnapshot; CUP_SIZE]),
    DeactivationRelease(Vec<TrackSnapshot>),
}

impl SideEffect {
    pub fn snapshots(&self) -> &[TrackSnapshot] {
        match self {
            Self::SweepLock(tracks) => tracks,
            Self::DeactivationRelease(tracks) => tracks,
        }
    }
}

/// One immutable entry in a season's event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub season: SeasonId,
    pub occurred_at: DateTime<Utc>,
    pub detail: EventDetail,
    /// Status of every touched track before the event.
    pub pre: Vec<TrackSnapshot>,
    /// Status of every touched track after the event.
    pub post: Vec<TrackSnapshot>,
    pub side_effects: Option<SideEffect>,
    /// Set when the event has been undone. Reversed events stay in the log.
    pub reversed_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.detail.kind()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed_at.is_some()
    }

    /// Race event this one is chained to, if any.
    pub fn caused_by(&self) -> Option<EventId> {
        match self.detail {
            EventDetail::Sweep { caused_by, .. } => Some(caused_by),
            _ => None,
        }
    }

    /// Every track id named in the pre, post or side-effect snapshots.
    pub fn touched(&self) -> Vec<TrackId> {
        let mut tracks: Vec<TrackId> = self
            .pre
            .iter()
            .chain(&self.post)
            .chain(self.side_effects.iter().flat_map(SideEffect::snapshots))
            .map(|snapshot| snapshot.track)
            .collect();
        tracks.sort();
        tracks.dedup();
        tracks
    }

    pub fn touches(&self, track: TrackId) -> bool {
        self.touched().contains(&track)
    }

    /// Whether `player` is the actor of this event or appears in any snapshot.
    pub fn involves(&self, player: PlayerId) -> bool {
        let actor = match &self.detail {
            EventDetail::RaceResult { winner, loser, .. } => {
                *winner == player || *loser == Some(player)
            }
            EventDetail::Sweep { owner, .. } => *owner == player,
            EventDetail::PlayerDeactivation { player: p } => *p == player,
        };
        actor
            || self.pre.iter().chain(&self.post).any(|snapshot| {
                snapshot.status.owner == Some(player)
                    || snapshot.status.threatened_by == Some(player)
            })
    }

    /// Snapshots to write back when undoing this event, in application order:
    /// side effects first, then the event's own pre-state.
    pub fn restoration(&self) -> Vec<TrackSnapshot> {
        self.side_effects
            .iter()
            .flat_map(SideEffect::snapshots)
            .chain(&self.pre)
            .copied()
            .collect()
    }

    /// Post-state recorded for `track`, if this event touched it.
    pub fn post_of(&self, track: TrackId) -> Option<&TrackSnapshot> {
        self.post.iter().find(|snapshot| snapshot.track == track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TrackStatus;

    const A: PlayerId = PlayerId(1);
    const B: PlayerId = PlayerId(2);

    fn race_event() -> Event {
        Event {
            id: EventId(1),
            season: SeasonId(1),
            occurred_at: Utc::now(),
            detail: EventDetail::RaceResult {
                track: TrackId(4),
                winner: B,
                loser: None,
                racer_count: 3,
                transition: TransitionKind::Risk,
            },
            pre: vec![TrackSnapshot::new(TrackId(4), TrackStatus::owned(A))],
            post: vec![TrackSnapshot::new(TrackId(4), TrackStatus::at_risk(A, B))],
            side_effects: None,
            reversed_at: None,
        }
    }

    #[test]
    fn kind_follows_detail() {
        assert_eq!(race_event().kind(), EventKind::RaceResult);
        assert_eq!(EventKind::parse("SWEEP"), Some(EventKind::Sweep));
        assert_eq!(EventKind::parse("bogus"), None);
    }

    #[test]
    fn involvement_covers_actor_and_snapshots() {
        let event = race_event();
        assert!(event.involves(A));
        assert!(event.involves(B));
        assert!(!event.involves(PlayerId(3)));
    }

    #[test]
    fn restoration_applies_side_effects_before_pre_state() {
        let mut event = race_event();
        let side = TrackSnapshot::new(TrackId(7), TrackStatus::owned(A));
        event.side_effects = Some(SideEffect::DeactivationRelease(vec![side]));
        let plan = event.restoration();
        assert_eq!(plan.first(), Some(&side));
        assert_eq!(plan.last(), event.pre.last());
        assert_eq!(event.touched(), vec![TrackId(4), TrackId(7)]);
    }

    #[test]
    fn only_sweeps_are_chained() {
        let mut event = race_event();
        assert_eq!(event.caused_by(), None);
        event.detail = EventDetail::Sweep {
            cup: CupId(1),
            owner: A,
            caused_by: EventId(0),
        };
        assert_eq!(event.caused_by(), Some(EventId(0)));
    }

    #[test]
    fn event_serializes_correctly() {
        let event = race_event();
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
