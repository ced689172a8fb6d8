//! Structural checks over a season's log, run when a log is loaded from
//! outside the process.

use super::event::{Event, EventDetail, SideEffect};
use super::log::EventLog;
use crate::core::{EventId, PlayerId, SeasonId, TrackId, TrackStatus};
use crate::machine::{leads_to, HunterPolicy};
use crate::registry::TrackRegistry;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("Event {event} belongs to season {found}, expected {expected}")]
    ForeignEvent {
        event: EventId,
        expected: SeasonId,
        found: SeasonId,
    },

    #[error("Event {event} is out of order")]
    OutOfOrder { event: EventId },

    #[error("Event {event} references unknown track {track}")]
    UnknownTrack { event: EventId, track: TrackId },

    #[error("Event {event} holds an inconsistent snapshot of {track}: {reason}")]
    BadSnapshot {
        event: EventId,
        track: TrackId,
        reason: &'static str,
    },

    #[error("Race {event} cannot produce its recorded post-state")]
    Unreachable { event: EventId },

    #[error("Sweep {event} is not chained to a preceding race")]
    BrokenChain { event: EventId },

    #[error("Event {event} side effects do not match its snapshots")]
    SideEffectMismatch { event: EventId },

    #[error("Sweep {event} and its race disagree on reversal")]
    SplitReversal { event: EventId },

    #[error("Track {track} does not hold the state left by event {event}")]
    StaleRegistry { event: EventId, track: TrackId },
}

/// Check every event in `log` against itself and the registry's tracks.
///
/// Race post-states must follow from their pre-states under either hunter
/// policy, since a season may outlive a configuration change.
pub fn verify_log(
    season: SeasonId,
    log: &EventLog,
    registry: &TrackRegistry,
) -> Result<(), IntegrityError> {
    let mut previous: Option<EventId> = None;
    for event in log.events() {
        if event.season != season {
            return Err(IntegrityError::ForeignEvent {
                event: event.id,
                expected: season,
                found: event.season,
            });
        }
        if previous.is_some_and(|prev| prev >= event.id) {
            return Err(IntegrityError::OutOfOrder { event: event.id });
        }
        previous = Some(event.id);

        check_snapshots(event, registry)?;
        match &event.detail {
            EventDetail::RaceResult { winner, .. } => check_race(event, *winner)?,
            EventDetail::Sweep { owner, caused_by, .. } => {
                check_sweep(log, event, *caused_by)?;
                if !event.post.iter().all(|s| s.status == TrackStatus::locked(*owner)) {
                    return Err(IntegrityError::SideEffectMismatch { event: event.id });
                }
            }
            EventDetail::PlayerDeactivation { player } => {
                let released = event.pre.iter().all(|s| s.status.is_owned_by(*player))
                    && event.post.iter().all(|s| s.status.is_unowned());
                if !released {
                    return Err(IntegrityError::SideEffectMismatch { event: event.id });
                }
            }
        }
        check_side_effects(event)?;
    }
    check_live_tail(log, registry)
}

/// Each track must hold the post-state of the newest live event touching it.
fn check_live_tail(log: &EventLog, registry: &TrackRegistry) -> Result<(), IntegrityError> {
    for track in registry.tracks() {
        let newest = log
            .events()
            .iter()
            .rev()
            .filter(|event| !event.is_reversed())
            .find_map(|event| event.post_of(track.id).map(|post| (event.id, post.status)));
        if let Some((event, status)) = newest {
            if status != track.status {
                return Err(IntegrityError::StaleRegistry {
                    event,
                    track: track.id,
                });
            }
        }
    }
    Ok(())
}

fn check_snapshots(event: &Event, registry: &TrackRegistry) -> Result<(), IntegrityError> {
    let side = event.side_effects.iter().flat_map(SideEffect::snapshots);
    for snapshot in event.pre.iter().chain(&event.post).chain(side) {
        if registry.track(snapshot.track).is_none() {
            return Err(IntegrityError::UnknownTrack {
                event: event.id,
                track: snapshot.track,
            });
        }
        if let Some(reason) = snapshot.status.violation() {
            return Err(IntegrityError::BadSnapshot {
                event: event.id,
                track: snapshot.track,
                reason,
            });
        }
    }
    Ok(())
}

fn check_race(event: &Event, winner: PlayerId) -> Result<(), IntegrityError> {
    let (Some(pre), Some(post)) = (event.pre.first(), event.post.first()) else {
        return Err(IntegrityError::Unreachable { event: event.id });
    };
    let reachable = pre.track == post.track
        && [HunterPolicy::Rethreat, HunterPolicy::FreeForAll]
            .into_iter()
            .any(|policy| leads_to(&pre.status, winner, &post.status, policy));
    if reachable {
        Ok(())
    } else {
        Err(IntegrityError::Unreachable { event: event.id })
    }
}

fn check_sweep(log: &EventLog, sweep: &Event, caused_by: EventId) -> Result<(), IntegrityError> {
    let cause = log
        .get(caused_by)
        .filter(|cause| cause.id < sweep.id && matches!(cause.detail, EventDetail::RaceResult { .. }))
        .ok_or(IntegrityError::BrokenChain { event: sweep.id })?;
    if cause.is_reversed() != sweep.is_reversed() {
        return Err(IntegrityError::SplitReversal { event: sweep.id });
    }
    Ok(())
}

fn check_side_effects(event: &Event) -> Result<(), IntegrityError> {
    let matches = match (&event.detail, &event.side_effects) {
        (EventDetail::RaceResult { .. }, None) => true,
        (EventDetail::Sweep { .. }, Some(SideEffect::SweepLock(before))) => {
            before.as_slice() == event.pre.as_slice()
        }
        (EventDetail::PlayerDeactivation { .. }, Some(SideEffect::DeactivationRelease(released))) => {
            released == &event.pre
        }
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(IntegrityError::SideEffectMismatch { event: event.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CupId, TrackSnapshot};
    use crate::machine::TransitionKind;
    use crate::registry::fixtures;
    use chrono::Utc;

    const S: SeasonId = SeasonId(1);
    const A: PlayerId = PlayerId(1);
    const B: PlayerId = PlayerId(2);

    fn claim(log: &mut EventLog, track: u64, winner: PlayerId) -> EventId {
        log.record(
            S,
            EventDetail::RaceResult {
                track: TrackId(track),
                winner,
                loser: None,
                racer_count: 3,
                transition: TransitionKind::Claim,
            },
            vec![TrackSnapshot::new(TrackId(track), TrackStatus::unowned())],
            vec![TrackSnapshot::new(TrackId(track), TrackStatus::owned(winner))],
            None,
        )
    }

    #[test]
    fn well_formed_log_passes() {
        let mut registry = fixtures::registry(1);
        let mut log = EventLog::new();
        claim(&mut log, 11, A);
        claim(&mut log, 12, B);
        registry.set_status(TrackId(11), TrackStatus::owned(A));
        registry.set_status(TrackId(12), TrackStatus::owned(B));
        assert_eq!(verify_log(S, &log, &registry), Ok(()));
    }

    #[test]
    fn stale_registry_is_caught() {
        let registry = fixtures::registry(1);
        let mut log = EventLog::new();
        let id = claim(&mut log, 11, A);
        assert_eq!(
            verify_log(S, &log, &registry),
            Err(IntegrityError::StaleRegistry {
                event: id,
                track: TrackId(11)
            })
        );

        log.mark_reversed(id, Utc::now());
        assert_eq!(verify_log(S, &log, &registry), Ok(()));
    }

    #[test]
    fn unreachable_race_is_caught() {
        let registry = fixtures::registry(1);
        let mut log = EventLog::new();
        let id = log.record(
            S,
            EventDetail::RaceResult {
                track: TrackId(11),
                winner: A,
                loser: None,
                racer_count: 3,
                transition: TransitionKind::Lock,
            },
            vec![TrackSnapshot::new(TrackId(11), TrackStatus::unowned())],
            vec![TrackSnapshot::new(TrackId(11), TrackStatus::locked(A))],
            None,
        );
        assert_eq!(
            verify_log(S, &log, &registry),
            Err(IntegrityError::Unreachable { event: id })
        );
    }

    #[test]
    fn race_must_be_won_by_its_recorded_winner() {
        let mut registry = fixtures::registry(1);
        let mut log = EventLog::new();
        // Reachable if B had won, but the event says A did.
        let id = log.record(
            S,
            EventDetail::RaceResult {
                track: TrackId(11),
                winner: A,
                loser: None,
                racer_count: 3,
                transition: TransitionKind::Claim,
            },
            vec![TrackSnapshot::new(TrackId(11), TrackStatus::unowned())],
            vec![TrackSnapshot::new(TrackId(11), TrackStatus::owned(B))],
            None,
        );
        registry.set_status(TrackId(11), TrackStatus::owned(B));
        assert!(crate::machine::is_reachable(
            &TrackStatus::unowned(),
            &TrackStatus::owned(B),
            HunterPolicy::Rethreat
        ));
        assert_eq!(
            verify_log(S, &log, &registry),
            Err(IntegrityError::Unreachable { event: id })
        );
    }

    #[test]
    fn unknown_track_is_caught() {
        let registry = fixtures::registry(1);
        let mut log = EventLog::new();
        let id = claim(&mut log, 99, A);
        assert_eq!(
            verify_log(S, &log, &registry),
            Err(IntegrityError::UnknownTrack {
                event: id,
                track: TrackId(99)
            })
        );
    }

    #[test]
    fn half_reversed_sweep_is_caught() {
        let mut registry = fixtures::registry(1);
        let mut log = EventLog::new();
        let cause = claim(&mut log, 14, A);
        let before = [11, 12, 13, 14].map(|id| TrackSnapshot::new(TrackId(id), TrackStatus::owned(A)));
        let after = before.map(|s| TrackSnapshot::new(s.track, TrackStatus::locked(A)));
        let sweep = log.record(
            S,
            EventDetail::Sweep {
                cup: CupId(1),
                owner: A,
                caused_by: cause,
            },
            before.to_vec(),
            after.to_vec(),
            Some(SideEffect::SweepLock(before)),
        );
        registry.apply(&after);
        assert_eq!(verify_log(S, &log, &registry), Ok(()));

        log.mark_reversed(sweep, Utc::now());
        assert_eq!(
            verify_log(S, &log, &registry),
            Err(IntegrityError::SplitReversal { event: sweep })
        );
    }

    #[test]
    fn foreign_season_is_caught() {
        let registry = fixtures::registry(1);
        let mut log = EventLog::new();
        claim(&mut log, 11, A);
        assert!(matches!(
            verify_log(SeasonId(2), &log, &registry),
            Err(IntegrityError::ForeignEvent { .. })
        ));
    }
}
