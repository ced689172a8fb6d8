//! End-to-end behaviour of the ledger through its public operations.

mod common;

use common::{cup_tracks, ledger, race, status, track_id, SEASON};
use trackward::core::{PlayerId, TrackState, TrackStatus};
use trackward::deactivation::DeactivationError;
use trackward::enforcement::{RaceSubmission, RaceViolation, Racers};
use trackward::journal::{EventFilter, EventKind};
use trackward::machine::{TransitionError, TransitionKind};
use trackward::registry::TrackFilter;
use trackward::undo::UndoError;
use trackward::LedgerError;

#[test]
fn claim_risk_steal_then_undo() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 1);
    let (a, b) = (players[0], players[1]);
    let t = track_id(1, 1);

    let claim = ledger.submit_race_result(SEASON, race(t, a, 4)).unwrap();
    assert_eq!(claim.outcome.kind, TransitionKind::Claim);
    assert_eq!(status(&ledger, t), TrackStatus::owned(a));

    let risk = ledger.submit_race_result(SEASON, race(t, b, 3)).unwrap();
    assert_eq!(risk.outcome.kind, TransitionKind::Risk);
    assert_eq!(status(&ledger, t), TrackStatus::at_risk(a, b));

    let steal = ledger.submit_race_result(SEASON, race(t, b, 3)).unwrap();
    assert_eq!(steal.outcome.kind, TransitionKind::Steal);
    assert_eq!(status(&ledger, t), TrackStatus::owned(b));

    let summary = ledger.request_undo(SEASON).unwrap();
    assert_eq!(summary.reverted, vec![steal.event]);
    assert_eq!(status(&ledger, t), TrackStatus::at_risk(a, b));
}

#[test]
fn every_table_row_undoes_to_its_pre_state() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 1);
    let (a, b, c) = (players[0], players[1], players[2]);
    let t = track_id(1, 1);

    // (winner, expected status after, expected kind)
    let steps = [
        (a, TrackStatus::owned(a), TransitionKind::Claim),
        (a, TrackStatus::locked(a), TransitionKind::Lock),
        (a, TrackStatus::locked(a), TransitionKind::Hold),
        (b, TrackStatus::owned(a), TransitionKind::Break),
        (b, TrackStatus::at_risk(a, b), TransitionKind::Risk),
        (c, TrackStatus::at_risk(a, c), TransitionKind::Rethreat),
        (a, TrackStatus::owned(a), TransitionKind::Defend),
        (c, TrackStatus::at_risk(a, c), TransitionKind::Risk),
        (c, TrackStatus::owned(c), TransitionKind::Steal),
    ];

    for (winner, expected, kind) in steps {
        let before = status(&ledger, t);
        let receipt = ledger.submit_race_result(SEASON, race(t, winner, 3)).unwrap();
        assert_eq!(receipt.outcome.kind, kind);
        assert_eq!(status(&ledger, t), expected);

        ledger.request_undo(SEASON).unwrap();
        assert_eq!(status(&ledger, t), before, "undo of {kind} must restore");

        ledger.submit_race_result(SEASON, race(t, winner, 3)).unwrap();
    }
}

#[test]
fn short_race_is_ignored() {
    let (mut ledger, players) = ledger(&["Ana", "Beto"], 1);
    let t = track_id(1, 1);

    let err = ledger
        .submit_race_result(SEASON, race(t, players[0], 2))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Transition(TransitionError::InsufficientRacers {
            required: 3,
            actual: 2
        })
    ));
    assert_eq!(status(&ledger, t), TrackStatus::unowned());
    assert!(ledger
        .list_events(SEASON, &EventFilter::default().with_reversed())
        .unwrap()
        .is_empty());
}

#[test]
fn short_race_is_reported_before_bad_references() {
    let (mut ledger, _) = ledger(&["Ana"], 1);
    let err = ledger
        .submit_race_result(SEASON, race(track_id(1, 1), PlayerId(99), 1))
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Transition(TransitionError::InsufficientRacers { .. })
    ));
}

#[test]
fn bad_references_are_reported_together() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 1);
    let submission = RaceSubmission::new(
        track_id(1, 1),
        PlayerId(99),
        Racers::Roster(vec![players[0], players[1], players[1]]),
    )
    .with_loser(PlayerId(98));

    match ledger.submit_race_result(SEASON, submission).unwrap_err() {
        LedgerError::Transition(TransitionError::InvalidTransitionInput { violations }) => {
            assert!(violations.contains(&RaceViolation::UnknownWinner(PlayerId(99))));
            assert!(violations.contains(&RaceViolation::UnknownLoser(PlayerId(98))));
            assert!(violations.contains(&RaceViolation::DuplicateRacer(players[1])));
        }
        other => panic!("Expected InvalidTransitionInput, got {other:?}"),
    }
    assert_eq!(status(&ledger, track_id(1, 1)), TrackStatus::unowned());
}

#[test]
fn sweep_locks_cup_and_undo_reverts_race_too() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 2);
    let (a, b) = (players[0], players[1]);
    let [t1, t2, t3, t4] = cup_tracks(1);

    ledger.submit_race_result(SEASON, race(t1, a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(t2, a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(t2, a, 3)).unwrap(); // locks t2
    ledger.submit_race_result(SEASON, race(t3, a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(t3, b, 3)).unwrap(); // t3 at risk
    ledger.submit_race_result(SEASON, race(t4, b, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(t4, a, 3)).unwrap(); // risk by a
    let pre_sweep: Vec<TrackStatus> = cup_tracks(1).iter().map(|&t| status(&ledger, t)).collect();

    let receipt = ledger.submit_race_result(SEASON, race(t4, a, 3)).unwrap();
    assert_eq!(receipt.outcome.kind, TransitionKind::Steal);
    let sweep = receipt.sweep.expect("fourth track completes the cup");
    for t in cup_tracks(1) {
        assert_eq!(status(&ledger, t), TrackStatus::locked(a));
    }

    let sweeps = ledger
        .list_events(SEASON, &EventFilter::default().kind(EventKind::Sweep))
        .unwrap();
    assert_eq!(sweeps.len(), 1);
    assert_eq!(sweeps[0].caused_by(), Some(receipt.event));

    let summary = ledger.request_undo(SEASON).unwrap();
    assert_eq!(summary.kind, EventKind::Sweep);
    assert_eq!(summary.reverted, vec![sweep, receipt.event]);
    let restored: Vec<TrackStatus> = cup_tracks(1).iter().map(|&t| status(&ledger, t)).collect();
    assert_eq!(restored, pre_sweep);
    assert_eq!(status(&ledger, t4), TrackStatus::at_risk(b, a));
}

#[test]
fn swept_cup_never_sweeps_twice() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 1);
    let (a, b) = (players[0], players[1]);
    for t in cup_tracks(1) {
        ledger.submit_race_result(SEASON, race(t, a, 3)).unwrap();
    }
    let t1 = track_id(1, 1);

    // Owner holds, a challenger breaks the lock, the owner locks again.
    for winner in [a, b, a, b, a] {
        let receipt = ledger.submit_race_result(SEASON, race(t1, winner, 3)).unwrap();
        assert_eq!(receipt.sweep, None);
    }
    let sweeps = ledger
        .list_events(SEASON, &EventFilter::default().kind(EventKind::Sweep))
        .unwrap();
    assert_eq!(sweeps.len(), 1);
}

#[test]
fn lost_and_retaken_track_sweeps_again() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 1);
    let (a, b) = (players[0], players[1]);
    for t in cup_tracks(1) {
        ledger.submit_race_result(SEASON, race(t, a, 3)).unwrap();
    }
    let t1 = track_id(1, 1);
    for winner in [b, b, b] {
        ledger.submit_race_result(SEASON, race(t1, winner, 3)).unwrap();
    }
    assert_eq!(status(&ledger, t1), TrackStatus::owned(b));

    ledger.submit_race_result(SEASON, race(t1, a, 3)).unwrap();
    let receipt = ledger.submit_race_result(SEASON, race(t1, a, 3)).unwrap();
    assert_eq!(receipt.outcome.kind, TransitionKind::Steal);
    assert!(receipt.sweep.is_some());
}

#[test]
fn deactivation_round_trip() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 2);
    let (a, b) = (players[0], players[1]);
    ledger.submit_race_result(SEASON, race(track_id(1, 1), a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(track_id(1, 2), a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(track_id(1, 2), a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(track_id(2, 1), a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(track_id(2, 1), b, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(track_id(2, 2), b, 3)).unwrap();
    let before = ledger.season(SEASON).unwrap().registry.clone();

    let event = ledger.submit_deactivation(SEASON, a).unwrap();
    assert!(!ledger.player(a).unwrap().active);
    assert!(ledger
        .list_tracks(SEASON, &TrackFilter::default().owner(a))
        .unwrap()
        .is_empty());
    assert_eq!(status(&ledger, track_id(2, 2)), TrackStatus::owned(b));
    let recorded = ledger
        .list_events(SEASON, &EventFilter::default().limit(1))
        .unwrap();
    assert_eq!(recorded[0].id, event);
    assert_eq!(recorded[0].side_effects.as_ref().unwrap().snapshots().len(), 3);

    let err = ledger.submit_deactivation(SEASON, a).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Deactivation(DeactivationError::PlayerInactive(_))
    ));
    let refused = ledger
        .submit_race_result(SEASON, race(track_id(1, 3), a, 3))
        .unwrap_err();
    assert!(matches!(
        refused,
        LedgerError::Transition(TransitionError::InvalidTransitionInput { .. })
    ));

    let summary = ledger.request_undo(SEASON).unwrap();
    assert_eq!(summary.reactivated, Some(a));
    assert!(ledger.player(a).unwrap().active);
    assert_eq!(ledger.season(SEASON).unwrap().registry, before);
}

#[test]
fn undo_walks_back_one_event_at_a_time() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 1);
    let (a, b) = (players[0], players[1]);
    let t = track_id(1, 1);
    let first = ledger.submit_race_result(SEASON, race(t, a, 3)).unwrap();
    let second = ledger.submit_race_result(SEASON, race(t, b, 3)).unwrap();

    assert_eq!(ledger.request_undo(SEASON).unwrap().reverted, vec![second.event]);
    assert_eq!(ledger.request_undo(SEASON).unwrap().reverted, vec![first.event]);
    assert_eq!(status(&ledger, t), TrackStatus::unowned());

    let err = ledger.request_undo(SEASON).unwrap_err();
    assert!(matches!(err, LedgerError::Undo(UndoError::NoEvents { .. })));

    let all = ledger
        .list_events(SEASON, &EventFilter::default().with_reversed())
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|event| event.is_reversed()));

    let next = ledger.submit_race_result(SEASON, race(t, b, 3)).unwrap();
    assert!(next.event > second.event, "ids are never reused");
}

#[test]
fn listings_filter_and_order() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 2);
    let (a, b) = (players[0], players[1]);
    ledger.submit_race_result(SEASON, race(track_id(2, 3), a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(track_id(1, 4), a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(track_id(1, 2), a, 3)).unwrap();
    ledger.submit_race_result(SEASON, race(track_id(1, 2), b, 3)).unwrap();

    let owned: Vec<_> = ledger
        .list_tracks(SEASON, &TrackFilter::default().owner(a))
        .unwrap()
        .into_iter()
        .map(|track| track.code.as_str())
        .collect();
    assert_eq!(owned, vec!["C1T2", "C1T4", "C2T3"]);

    let at_risk = ledger
        .list_tracks(SEASON, &TrackFilter::default().state(TrackState::AtRisk))
        .unwrap();
    assert_eq!(at_risk.len(), 1);
    assert_eq!(
        ledger
            .list_tracks(SEASON, &TrackFilter::default().cup("CUP2"))
            .unwrap()
            .len(),
        4
    );

    let involving_b = ledger
        .list_events(SEASON, &EventFilter::default().involving(b))
        .unwrap();
    assert_eq!(involving_b.len(), 1);

    let oldest = ledger
        .list_events(SEASON, &EventFilter::default().oldest_first().limit(2))
        .unwrap();
    assert_eq!(oldest.len(), 2);
    assert!(oldest[0].id < oldest[1].id);
}

#[test]
fn inactive_players_cannot_fill_a_race() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 1);
    let (a, b, c) = (players[0], players[1], players[2]);
    ledger.submit_deactivation(SEASON, c).unwrap();

    let roster = RaceSubmission::new(track_id(1, 1), a, Racers::Roster(vec![a, b, c]));
    match ledger.submit_race_result(SEASON, roster).unwrap_err() {
        LedgerError::Transition(TransitionError::InvalidTransitionInput { violations }) => {
            assert_eq!(violations, vec![RaceViolation::InactiveRacer(c)]);
        }
        other => panic!("Expected InvalidTransitionInput, got {other:?}"),
    }

    let with_loser = race(track_id(1, 1), a, 3).with_loser(c);
    match ledger.submit_race_result(SEASON, with_loser).unwrap_err() {
        LedgerError::Transition(TransitionError::InvalidTransitionInput { violations }) => {
            assert_eq!(violations, vec![RaceViolation::InactiveLoser(c)]);
        }
        other => panic!("Expected InvalidTransitionInput, got {other:?}"),
    }

    assert_eq!(status(&ledger, track_id(1, 1)), TrackStatus::unowned());
    assert_eq!(
        ledger.list_events(SEASON, &EventFilter::default()).unwrap().len(),
        1
    );
}

#[test]
fn only_one_season_is_open_at_a_time() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 1);
    let (a, b) = (players[0], players[1]);
    let next = trackward::SeasonId(2);
    ledger.submit_race_result(SEASON, race(track_id(1, 1), a, 3)).unwrap();

    let err = ledger.open_season(common::seed(next, 1)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::SeasonStillOpen { open, requested } if open == SEASON && requested == next
    ));
    assert_eq!(ledger.seasons().count(), 1);
    assert_eq!(ledger.current_season(), Some(SEASON));

    // Deactivation in the one open season releases everything the player owns.
    ledger.submit_deactivation(SEASON, a).unwrap();
    assert!(ledger
        .list_tracks(SEASON, &TrackFilter::default().owner(a))
        .unwrap()
        .is_empty());

    ledger.archive_season(SEASON).unwrap();
    assert_eq!(ledger.current_season(), None);
    ledger.open_season(common::seed(next, 1)).unwrap();
    assert_eq!(ledger.current_season(), Some(next));
    ledger.submit_race_result(next, race(track_id(1, 1), b, 3)).unwrap();
    assert!(matches!(
        ledger.request_undo(SEASON),
        Err(LedgerError::SeasonArchived(_))
    ));
}

#[test]
fn seasons_are_isolated() {
    let (mut ledger, players) = ledger(&["Ana", "Beto", "Cris"], 1);
    let (a, b) = (players[0], players[1]);
    ledger.submit_race_result(SEASON, race(track_id(1, 1), a, 3)).unwrap();
    ledger.archive_season(SEASON).unwrap();
    let other = ledger.open_season(common::seed(trackward::SeasonId(2), 1)).unwrap();

    assert!(ledger
        .get_track_state(other, track_id(1, 1))
        .unwrap()
        .status
        .is_unowned());
    assert!(matches!(
        ledger.request_undo(other),
        Err(LedgerError::Undo(UndoError::NoEvents { .. }))
    ));
    assert!(matches!(
        ledger.submit_deactivation(SEASON, a),
        Err(LedgerError::SeasonArchived(_))
    ));

    ledger.submit_race_result(other, race(track_id(1, 1), b, 3)).unwrap();
    assert_eq!(status(&ledger, track_id(1, 1)), TrackStatus::owned(a));
    assert_eq!(
        ledger.get_track_state(other, track_id(1, 1)).unwrap().status,
        TrackStatus::owned(b)
    );
}
