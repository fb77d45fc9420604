//! FILENAME: tests/test_collaboration.rs
//! Integration tests for collaboration sessions, presence and change events.

mod common;

use app_lib::{
    close_spreadsheet, create_pivot, delete_pivot, get_collaborators, heartbeat, join_session,
    leave_session, start_collaboration, subscribe, sweep_sessions, update_cells, update_presence,
    PivotRequest, PresenceRequest, ServiceError, UpdateCellsRequest,
};
use chrono::Duration;
use collab::{CollabError, CollabEvent, LeaveReason, ParticipantId};
use common::TestHarness;
use engine::{CellKey, CellRange, CellValue};
use pivot_engine::{AggregationType, FieldRef, MeasureField};
use tokio::sync::broadcast::error::TryRecvError;

fn edit_as(harness: &TestHarness, participant: ParticipantId, row: u32, col: u32, raw: &str) {
    update_cells(
        &harness.state,
        harness.id,
        UpdateCellsRequest {
            sheet_index: 0,
            start_row: row,
            start_col: col,
            values: vec![vec![raw.to_string()]],
            participant: Some(participant),
        },
    )
    .unwrap();
}

#[test]
fn test_start_is_idempotent() {
    let harness = TestHarness::new();
    let first = start_collaboration(&harness.state, harness.id).unwrap();
    let second = start_collaboration(&harness.state, harness.id).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.spreadsheet_id, harness.id);

    assert!(matches!(
        start_collaboration(&harness.state, uuid::Uuid::new_v4()),
        Err(ServiceError::SpreadsheetNotFound(_))
    ));
}

#[test]
fn test_participants_see_each_other_in_join_order() {
    let harness = TestHarness::new();
    start_collaboration(&harness.state, harness.id).unwrap();
    let alice = join_session(&harness.state, harness.id, "alice").unwrap();
    let bob = join_session(&harness.state, harness.id, "bob").unwrap();

    let collaborators = get_collaborators(&harness.state, harness.id).unwrap();
    let ids: Vec<_> = collaborators.iter().map(|c| c.participant_id).collect();
    assert_eq!(ids, vec![alice, bob]);
    assert_eq!(collaborators[1].user, "bob");

    leave_session(&harness.state, harness.id, alice).unwrap();
    let collaborators = get_collaborators(&harness.state, harness.id).unwrap();
    assert_eq!(collaborators.len(), 1);
    assert!(matches!(
        leave_session(&harness.state, harness.id, alice),
        Err(ServiceError::Collab(CollabError::UnknownParticipant(_)))
    ));
}

#[test]
fn test_join_requires_session_and_name() {
    let harness = TestHarness::new();
    assert!(matches!(
        join_session(&harness.state, harness.id, "alice"),
        Err(ServiceError::Collab(CollabError::UnknownSession(_)))
    ));

    start_collaboration(&harness.state, harness.id).unwrap();
    assert!(matches!(
        join_session(&harness.state, harness.id, "   "),
        Err(ServiceError::InvalidInput(_))
    ));
}

#[test]
fn test_heartbeat_timeout() {
    let harness = TestHarness::new();
    start_collaboration(&harness.state, harness.id).unwrap();
    let alice = join_session(&harness.state, harness.id, "alice").unwrap();
    let bob = join_session(&harness.state, harness.id, "bob").unwrap();
    let mut events = subscribe(&harness.state, harness.id).unwrap();

    harness.clock.advance(Duration::seconds(20));
    heartbeat(&harness.state, harness.id, bob).unwrap();

    // Exactly at the timeout a participant is still present
    harness.clock.advance(Duration::seconds(10));
    assert_eq!(get_collaborators(&harness.state, harness.id).unwrap().len(), 2);

    harness.clock.advance(Duration::seconds(1));
    assert_eq!(sweep_sessions(&harness.state), 1);
    let visible = get_collaborators(&harness.state, harness.id).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].participant_id, bob);

    match events.try_recv().unwrap() {
        CollabEvent::ParticipantLeft {
            participant,
            reason,
            user,
            ..
        } => {
            assert_eq!(participant, alice);
            assert_eq!(user, "alice");
            assert_eq!(reason, LeaveReason::TimedOut);
        }
        other => panic!("unexpected event {:?}", other),
    }

    assert!(matches!(
        heartbeat(&harness.state, harness.id, alice),
        Err(ServiceError::Collab(CollabError::UnknownParticipant(_)))
    ));
}

#[test]
fn test_timed_out_participants_leave_without_a_sweep() {
    let harness = TestHarness::new();
    start_collaboration(&harness.state, harness.id).unwrap();
    let alice = join_session(&harness.state, harness.id, "alice").unwrap();
    let mut events = subscribe(&harness.state, harness.id).unwrap();

    harness.clock.advance(Duration::seconds(31));
    assert!(get_collaborators(&harness.state, harness.id).unwrap().is_empty());
    assert!(matches!(
        events.try_recv().unwrap(),
        CollabEvent::ParticipantLeft { participant, reason: LeaveReason::TimedOut, .. }
            if participant == alice
    ));

    // Joining announces departures first
    let bob = join_session(&harness.state, harness.id, "bob").unwrap();
    harness.clock.advance(Duration::seconds(31));
    join_session(&harness.state, harness.id, "carol").unwrap();
    assert!(matches!(events.try_recv().unwrap(), CollabEvent::ParticipantJoined { .. }));
    assert!(matches!(
        events.try_recv().unwrap(),
        CollabEvent::ParticipantLeft { participant, .. } if participant == bob
    ));
    assert!(matches!(events.try_recv().unwrap(), CollabEvent::ParticipantJoined { .. }));
    assert_eq!(sweep_sessions(&harness.state), 0);
}

#[test]
fn test_presence_updates() {
    let harness = TestHarness::new();
    start_collaboration(&harness.state, harness.id).unwrap();
    let alice = join_session(&harness.state, harness.id, "alice").unwrap();
    let mut events = subscribe(&harness.state, harness.id).unwrap();

    let selection = CellRange::new(0, (1, 1), (3, 2));
    update_presence(
        &harness.state,
        harness.id,
        PresenceRequest {
            participant: alice,
            cursor: Some(CellKey::new(0, 1, 1)),
            selection: Some(selection),
        },
    )
    .unwrap();

    let info = &get_collaborators(&harness.state, harness.id).unwrap()[0];
    assert_eq!(info.cursor, Some(CellKey::new(0, 1, 1)));
    assert_eq!(info.selection, Some(selection));

    match events.try_recv().unwrap() {
        CollabEvent::PresenceUpdated { participant, presence, .. } => {
            assert_eq!(participant, alice);
            assert_eq!(presence.selection, Some(selection));
        }
        other => panic!("unexpected event {:?}", other),
    }

    // Presence keeps a participant alive like a heartbeat
    harness.clock.advance(Duration::seconds(25));
    update_presence(
        &harness.state,
        harness.id,
        PresenceRequest {
            participant: alice,
            cursor: None,
            selection: None,
        },
    )
    .unwrap();
    harness.clock.advance(Duration::seconds(25));
    assert_eq!(sweep_sessions(&harness.state), 0);
}

#[test]
fn test_edits_are_broadcast() {
    let harness = TestHarness::new();
    harness.set("A1", "1");
    harness.set("A2", "=A1*10");
    start_collaboration(&harness.state, harness.id).unwrap();
    let alice = join_session(&harness.state, harness.id, "alice").unwrap();
    let mut events = subscribe(&harness.state, harness.id).unwrap();

    edit_as(&harness, alice, 0, 0, "2");

    match events.try_recv().unwrap() {
        CollabEvent::CellsUpdated { editor, cells, .. } => {
            assert_eq!(editor.as_deref(), Some("alice"));
            assert_eq!(cells, vec![CellKey::new(0, 0, 0), CellKey::new(0, 1, 0)]);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_concurrent_edits_last_write_wins() {
    let harness = TestHarness::new();
    start_collaboration(&harness.state, harness.id).unwrap();
    let alice = join_session(&harness.state, harness.id, "alice").unwrap();
    let bob = join_session(&harness.state, harness.id, "bob").unwrap();
    let mut events = subscribe(&harness.state, harness.id).unwrap();

    edit_as(&harness, alice, 0, 0, "from alice");
    edit_as(&harness, bob, 0, 0, "from bob");
    assert_eq!(harness.value("A1"), CellValue::Text("from bob".to_string()));

    assert!(matches!(
        events.try_recv().unwrap(),
        CollabEvent::CellsUpdated { .. }
    ));
    match events.try_recv().unwrap() {
        CollabEvent::EditOverwritten {
            cell,
            previous_editor,
            by,
            ..
        } => {
            assert_eq!(cell, CellKey::new(0, 0, 0));
            assert_eq!(previous_editor, "alice");
            assert_eq!(by, "bob");
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(
        events.try_recv().unwrap(),
        CollabEvent::CellsUpdated { revision, .. } if revision == 2
    ));

    // Rewriting your own cell is not an overwrite
    edit_as(&harness, bob, 0, 0, "again");
    assert!(matches!(
        events.try_recv().unwrap(),
        CollabEvent::CellsUpdated { .. }
    ));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_same_user_on_two_connections_is_two_editors() {
    let harness = TestHarness::new();
    start_collaboration(&harness.state, harness.id).unwrap();
    let laptop = join_session(&harness.state, harness.id, "alice").unwrap();
    let phone = join_session(&harness.state, harness.id, "alice").unwrap();
    let mut events = subscribe(&harness.state, harness.id).unwrap();

    edit_as(&harness, laptop, 0, 0, "1");
    edit_as(&harness, phone, 0, 0, "2");

    assert!(matches!(events.try_recv().unwrap(), CollabEvent::CellsUpdated { .. }));
    assert!(matches!(
        events.try_recv().unwrap(),
        CollabEvent::EditOverwritten { ref previous_editor, ref by, .. }
            if previous_editor == "alice" && by == "alice"
    ));
    assert!(matches!(events.try_recv().unwrap(), CollabEvent::CellsUpdated { .. }));
}

#[test]
fn test_unattributed_writes_reset_the_last_editor() {
    let harness = TestHarness::new();
    start_collaboration(&harness.state, harness.id).unwrap();
    let alice = join_session(&harness.state, harness.id, "alice").unwrap();
    let bob = join_session(&harness.state, harness.id, "bob").unwrap();

    edit_as(&harness, alice, 0, 0, "1");
    harness.set("A1", "2");
    let mut events = subscribe(&harness.state, harness.id).unwrap();
    edit_as(&harness, bob, 0, 0, "3");

    assert!(matches!(events.try_recv().unwrap(), CollabEvent::CellsUpdated { .. }));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn test_pivot_output_is_broadcast() {
    let harness = TestHarness::with_sales_data();
    harness.set("K2", "=I2*2");
    start_collaboration(&harness.state, harness.id).unwrap();
    let mut events = subscribe(&harness.state, harness.id).unwrap();

    let request = PivotRequest {
        source_sheet: 0,
        source_range: "A1:E13".to_string(),
        group_by: vec![FieldRef::from("Region")],
        measures: vec![MeasureField::new("Sales", AggregationType::Sum)],
        destination_sheet: None,
        destination_cell: Some("H1".to_string()),
    };
    let pivot = create_pivot(&harness.state, harness.id, request).unwrap();
    assert_eq!(harness.value("K2"), CellValue::Number(78000.0));

    match events.try_recv().unwrap() {
        CollabEvent::CellsUpdated { editor, cells, .. } => {
            assert_eq!(editor, None);
            assert!(cells.contains(&CellKey::new(0, 0, 7)));
            assert!(cells.contains(&CellKey::new(0, 1, 8)));
            assert!(cells.contains(&CellKey::new(0, 1, 10)));
        }
        other => panic!("unexpected event {:?}", other),
    }

    // An edit of the source refreshes the pivot; its output is announced too
    harness.set("D2", "20000");
    assert!(matches!(events.try_recv().unwrap(), CollabEvent::CellsUpdated { .. }));
    match events.try_recv().unwrap() {
        CollabEvent::CellsUpdated { cells, .. } => {
            assert!(cells.contains(&CellKey::new(0, 1, 8)));
            assert!(cells.contains(&CellKey::new(0, 1, 10)));
        }
        other => panic!("unexpected event {:?}", other),
    }

    delete_pivot(&harness.state, harness.id, pivot.pivot_id).unwrap();
    match events.try_recv().unwrap() {
        CollabEvent::CellsUpdated { cells, .. } => {
            assert!(cells.contains(&CellKey::new(0, 0, 7)));
            assert!(cells.contains(&CellKey::new(0, 1, 10)));
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(harness.value("K2"), CellValue::Number(0.0));
}

#[test]
fn test_unknown_participant_cannot_edit() {
    let harness = TestHarness::new();
    start_collaboration(&harness.state, harness.id).unwrap();

    let err = update_cells(
        &harness.state,
        harness.id,
        UpdateCellsRequest {
            sheet_index: 0,
            start_row: 0,
            start_col: 0,
            values: vec![vec!["1".to_string()]],
            participant: Some(uuid::Uuid::new_v4()),
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Collab(CollabError::UnknownParticipant(_))
    ));
    assert_eq!(harness.value("A1"), CellValue::Empty);
}

#[test]
fn test_closing_spreadsheet_ends_session() {
    let harness = TestHarness::new();
    start_collaboration(&harness.state, harness.id).unwrap();
    join_session(&harness.state, harness.id, "alice").unwrap();
    let mut events = subscribe(&harness.state, harness.id).unwrap();

    close_spreadsheet(&harness.state, harness.id).unwrap();

    assert!(matches!(
        events.try_recv().unwrap(),
        CollabEvent::ParticipantLeft {
            reason: LeaveReason::SessionClosed,
            ..
        }
    ));
    assert!(matches!(
        get_collaborators(&harness.state, harness.id),
        Err(ServiceError::Collab(CollabError::UnknownSession(_)))
    ));
}
