use corkboard_core::{
    BoardController, BoardView, Lobby, Router, SharedStore, SqliteStore, Viewport,
};
use std::sync::Arc;

#[test]
fn full_note_flow_works_over_the_sqlite_backend() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let mut router = Router::new();
    let created = Lobby::new(Arc::clone(&store))
        .create_board(&mut router)
        .unwrap();

    let mut view = BoardView::open(Arc::clone(&store), created.board, Viewport::new(800.0, 600.0));
    let id = view.add_note("hello").unwrap();

    view.begin_edit(id).unwrap();
    view.set_edit_buffer(id, "world").unwrap();
    view.save(id).unwrap();

    let snapshot = view.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.notes.len(), 1);
    assert_eq!(snapshot.notes[0].text, "world");
    assert!(!snapshot.notes[0].is_being_edited);

    view.request_delete(id).unwrap();
    assert!(view.confirm_delete(id).unwrap());
    assert_eq!(view.controller().note_count().unwrap(), 0);
}

#[test]
fn observers_fire_for_local_sqlite_mutations() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let mut router = Router::new();
    let created = Lobby::new(Arc::clone(&store))
        .create_board(&mut router)
        .unwrap();

    let view = BoardView::open(Arc::clone(&store), created.board, Viewport::new(800.0, 600.0));
    assert!(view.take_dirty());

    let controller = BoardController::new(Arc::clone(&store), created.board);
    controller.add_note("ping").unwrap();
    assert!(view.take_dirty());
}

#[test]
fn board_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corkboard.sqlite3");

    let (board, first, second) = {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let mut router = Router::new();
        let created = Lobby::new(Arc::clone(&store))
            .create_board(&mut router)
            .unwrap();
        let controller = BoardController::new(Arc::clone(&store), created.board);
        let first = controller.add_note("first").unwrap();
        let second = controller.add_note("second").unwrap();
        (created.board, first, second)
    };

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let controller = BoardController::new(Arc::clone(&store), board);
    assert_eq!(controller.note_ids().unwrap(), vec![first, second]);

    let view = BoardView::open(Arc::clone(&store), board, Viewport::new(800.0, 600.0));
    let snapshot = view.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.notes[0].text, "first");
    assert_eq!(snapshot.notes[1].text, "second");

    // The reopened client is still the board owner and may keep mutating.
    assert!(controller.remove_note(first).unwrap());
    assert_eq!(controller.note_ids().unwrap(), vec![second]);
}

#[test]
fn local_client_identity_is_stable_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.sqlite3");

    let first = SqliteStore::open(&path).unwrap().client_id();
    let second = SqliteStore::open(&path).unwrap().client_id();
    assert_eq!(first, second);
}

#[test]
fn positions_and_edit_flags_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("positions.sqlite3");

    let (board, id) = {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let mut router = Router::new();
        let created = Lobby::new(Arc::clone(&store))
            .create_board(&mut router)
            .unwrap();
        let mut view =
            BoardView::open(Arc::clone(&store), created.board, Viewport::new(1000.0, 1000.0));
        let id = view.add_note("pinned").unwrap();
        view.begin_drag(id).unwrap();
        view.drag_to(id, corkboard_core::PixelPoint::new(300.0, 700.0))
            .unwrap();
        view.end_drag(id).unwrap();
        view.close();
        (created.board, id)
    };

    let store = Arc::new(SqliteStore::open(&path).unwrap());
    let view = BoardView::open(Arc::clone(&store), board, Viewport::new(1000.0, 1000.0));
    let snapshot = view.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.notes[0].id, id);
    assert_eq!(snapshot.notes[0].position.x, 30.0);
    assert_eq!(snapshot.notes[0].position.y, 70.0);
    assert!(!snapshot.notes[0].is_being_edited);
}
