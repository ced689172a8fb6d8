//! Sweep detection: one player completing all four tracks of a cup.

use super::transition::Outcome;
use crate::core::{Cup, CupId, PlayerId, TrackId, TrackSnapshot, TrackStatus, CUP_SIZE};
use serde::{Deserialize, Serialize};

/// Compound effect of a completed sweep: every track in the cup gets locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepEffect {
    pub cup: CupId,
    pub owner: PlayerId,
    /// Status of each cup track after the race and before the lock.
    pub before: [TrackSnapshot; CUP_SIZE],
}

impl SweepEffect {
    /// The same four tracks, locked under the sweeping owner.
    pub fn after(&self) -> [TrackSnapshot; CUP_SIZE] {
        let owner = self.owner;
        self.before
            .map(|snapshot| TrackSnapshot::new(snapshot.track, TrackStatus::locked(owner)))
    }
}

/// Check whether `outcome` on `changed` completes a sweep of `cup`.
///
/// `status_of` must return statuses as they were before the race. Only
/// ownership-changing transitions are considered, and a sweep is reported
/// only when the new owner's count in the cup crosses from below
/// [`CUP_SIZE`] to exactly [`CUP_SIZE`], so an already swept cup never
/// yields a second effect.
pub fn detect_sweep<F>(
    cup: &Cup,
    changed: TrackId,
    outcome: &Outcome,
    status_of: F,
) -> Option<SweepEffect>
where
    F: Fn(TrackId) -> Option<TrackStatus>,
{
    if !outcome.kind.changes_owner() || !cup.contains(changed) {
        return None;
    }
    let owner = outcome.after.owner?;

    let post = cup.tracks.map(|track| {
        let status = if track == changed {
            Some(outcome.after)
        } else {
            status_of(track)
        };
        (track, status)
    });

    let owned_before = cup
        .tracks
        .iter()
        .filter(|&&track| {
            let status = if track == changed {
                Some(outcome.before)
            } else {
                status_of(track)
            };
            status.is_some_and(|s| s.is_owned_by(owner))
        })
        .count();
    let owned_after = post
        .iter()
        .filter(|(_, status)| status.is_some_and(|s| s.is_owned_by(owner)))
        .count();

    if owned_before >= CUP_SIZE || owned_after != CUP_SIZE {
        return None;
    }

    let mut before = [TrackSnapshot::new(changed, outcome.after); CUP_SIZE];
    for (slot, (track, status)) in before.iter_mut().zip(post) {
        *slot = TrackSnapshot::new(track, status?);
    }

    Some(SweepEffect {
        cup: cup.id,
        owner,
        before,
    })
}
