//! Undo engine: reverse the newest live event of a season.
//!
//! Undo is a strict stack. The target is always the newest event that has
//! not been reversed; reversed events stay in the log flagged with
//! `reversed_at`, so a second undo reaches the next older live event.
//!
//! A sweep and the race that completed it are undone together: when the
//! newest live event is a sweep, the four locks are rolled back and the
//! chained race is reverted in the same step.

use crate::core::{EventId, PlayerId, SeasonId, TrackId, TrackSnapshot, TrackStatus};
use crate::journal::{Event, EventDetail, EventKind, EventLog};
use crate::registry::TrackRegistry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UndoError {
    #[error("No events to undo in season {season}")]
    NoEvents { season: SeasonId },

    #[error("Event {event} has already been reversed")]
    AlreadyReversed { event: EventId },

    #[error("Sweep {sweep} is chained to {cause}, which is not the preceding live event")]
    BrokenChain { sweep: EventId, cause: EventId },

    #[error(
        "Track {track} does not match event {event}: expected {expected}, found {}",
        describe(.found)
    )]
    InconsistentSnapshot {
        event: EventId,
        track: TrackId,
        expected: TrackStatus,
        found: Option<TrackStatus>,
    },
}

fn describe(found: &Option<TrackStatus>) -> String {
    match found {
        Some(status) => status.to_string(),
        None => "no such track".to_string(),
    }
}

/// What an undo reverted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoSummary {
    pub season: SeasonId,
    /// Kind of the newest reverted event.
    pub kind: EventKind,
    /// Reverted event ids, newest first.
    pub reverted: Vec<EventId>,
    /// Final status of every track written back.
    pub restored: Vec<TrackSnapshot>,
    pub reactivated: Option<PlayerId>,
}

/// Writes needed to carry out an undo, computed without touching anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoPlan {
    /// Snapshots in application order; later entries win.
    pub writes: Vec<TrackSnapshot>,
    pub summary: UndoSummary,
}

/// Plan the undo of the newest live event in `log`.
///
/// Before anything is planned, every track the event touched is compared
/// against the live registry; a mismatch means the log and the registry
/// have diverged and is reported as [`UndoError::InconsistentSnapshot`]
/// instead of being patched over.
pub fn plan_undo(
    season: SeasonId,
    log: &EventLog,
    registry: &TrackRegistry,
) -> Result<UndoPlan, UndoError> {
    let target = log.newest_live().ok_or(UndoError::NoEvents { season })?;
    if target.is_reversed() {
        return Err(UndoError::AlreadyReversed { event: target.id });
    }

    verify_against_registry(target, registry)?;

    let mut writes = target.restoration();
    let mut reverted = vec![target.id];

    if let Some(cause_id) = target.caused_by() {
        let cause = chained_cause(log, target, cause_id)?;
        verify_against_snapshots(cause, target)?;
        writes.extend(cause.restoration());
        reverted.push(cause.id);
    }

    let reactivated = match target.detail {
        EventDetail::PlayerDeactivation { player } => Some(player),
        _ => None,
    };

    let mut restored: Vec<TrackSnapshot> = Vec::new();
    for write in &writes {
        match restored.iter_mut().find(|s| s.track == write.track) {
            Some(existing) => existing.status = write.status,
            None => restored.push(*write),
        }
    }
    restored.sort_by_key(|snapshot| snapshot.track);

    Ok(UndoPlan {
        writes,
        summary: UndoSummary {
            season,
            kind: target.kind(),
            reverted,
            restored,
            reactivated,
        },
    })
}

fn chained_cause<'a>(
    log: &'a EventLog,
    sweep: &Event,
    cause_id: EventId,
) -> Result<&'a Event, UndoError> {
    let cause = log.get(cause_id).ok_or(UndoError::BrokenChain {
        sweep: sweep.id,
        cause: cause_id,
    })?;
    if cause.is_reversed() {
        return Err(UndoError::AlreadyReversed { event: cause.id });
    }
    let preceding = log
        .events()
        .iter()
        .rev()
        .filter(|event| !event.is_reversed() && event.id < sweep.id)
        .map(|event| event.id)
        .next();
    if preceding != Some(cause_id) || cause.kind() != EventKind::RaceResult {
        return Err(UndoError::BrokenChain {
            sweep: sweep.id,
            cause: cause_id,
        });
    }
    Ok(cause)
}

/// The newest event's post-state must be exactly what the registry holds.
fn verify_against_registry(event: &Event, registry: &TrackRegistry) -> Result<(), UndoError> {
    for snapshot in &event.post {
        let found = registry.status(snapshot.track);
        if found != Some(snapshot.status) {
            tracing::error!(
                event = %event.id,
                track = %snapshot.track,
                expected = %snapshot.status,
                "Registry diverged from event log"
            );
            return Err(UndoError::InconsistentSnapshot {
                event: event.id,
                track: snapshot.track,
                expected: snapshot.status,
                found,
            });
        }
    }
    Ok(())
}

/// A chained race's post-state must be what the sweep saw before locking.
fn verify_against_snapshots(cause: &Event, sweep: &Event) -> Result<(), UndoError> {
    for snapshot in &cause.post {
        let found = sweep
            .pre
            .iter()
            .find(|pre| pre.track == snapshot.track)
            .map(|pre| pre.status);
        if found.is_some_and(|status| status != snapshot.status) {
            tracing::error!(
                event = %cause.id,
                sweep = %sweep.id,
                track = %snapshot.track,
                "Sweep snapshot diverged from its race"
            );
            return Err(UndoError::InconsistentSnapshot {
                event: cause.id,
                track: snapshot.track,
                expected: snapshot.status,
                found,
            });
        }
    }
    Ok(())
}
