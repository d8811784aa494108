use corkboard_core::{
    BoardController, BoardView, CreatedBoard, Lobby, MemoryStore, Router, Viewport,
};
use std::sync::Arc;
use uuid::Uuid;

fn open_board(store: &Arc<MemoryStore>) -> CreatedBoard {
    let mut router = Router::new();
    Lobby::new(Arc::clone(store))
        .create_board(&mut router)
        .unwrap()
}

fn viewport() -> Viewport {
    Viewport::new(1280.0, 720.0)
}

#[test]
fn add_note_increases_count_by_exactly_one() {
    let store = Arc::new(MemoryStore::new());
    let created = open_board(&store);
    let controller = BoardController::new(Arc::clone(&store), created.board);

    assert_eq!(controller.note_count().unwrap(), 0);
    controller.add_note("").unwrap();
    assert_eq!(controller.note_count().unwrap(), 1);
    controller.add_note("second").unwrap();
    assert_eq!(controller.note_count().unwrap(), 2);
}

#[test]
fn new_notes_start_inside_bounds_and_outside_edit_mode() {
    let store = Arc::new(MemoryStore::new());
    let created = open_board(&store);
    let mut view = BoardView::open(Arc::clone(&store), created.board, viewport());

    view.add_note("fresh").unwrap();
    let snapshot = view.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.notes.len(), 1);

    let note = &snapshot.notes[0];
    assert_eq!(note.text, "fresh");
    assert!(!note.is_being_edited);
    assert!((0.0..=100.0).contains(&note.position.x));
    assert!((0.0..=100.0).contains(&note.position.y));
}

#[test]
fn scenario_hello_edit_to_world_then_remove() {
    let store = Arc::new(MemoryStore::new());
    let created = open_board(&store);
    let mut view = BoardView::open(Arc::clone(&store), created.board, viewport());

    let id = view.add_note("hello").unwrap();
    let snapshot = view.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.notes.len(), 1);
    assert_eq!(snapshot.notes[0].text, "hello");
    assert!(!snapshot.notes[0].is_being_edited);

    view.begin_edit(id).unwrap();
    view.set_edit_buffer(id, "world").unwrap();
    view.save(id).unwrap();

    let snapshot = view.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.notes[0].text, "world");
    assert!(!snapshot.notes[0].is_being_edited);

    view.request_delete(id).unwrap();
    assert!(view.confirm_delete(id).unwrap());
    assert_eq!(view.controller().note_count().unwrap(), 0);
}

#[test]
fn remove_absent_note_is_a_noop() {
    let store = Arc::new(MemoryStore::new());
    let created = open_board(&store);
    let controller = BoardController::new(Arc::clone(&store), created.board);
    controller.add_note("keep me").unwrap();

    assert!(!controller.remove_note(Uuid::new_v4()).unwrap());
    assert_eq!(controller.note_count().unwrap(), 1);
}

#[test]
fn remove_preserves_relative_order_of_survivors() {
    let store = Arc::new(MemoryStore::new());
    let created = open_board(&store);
    let controller = BoardController::new(Arc::clone(&store), created.board);

    let a = controller.add_note("a").unwrap();
    let b = controller.add_note("b").unwrap();
    let c = controller.add_note("c").unwrap();

    assert!(controller.remove_note(b).unwrap());
    assert_eq!(controller.note_ids().unwrap(), vec![a, c]);
}

#[test]
fn remote_changes_mark_the_view_dirty() {
    let store = Arc::new(MemoryStore::new());
    let created = open_board(&store);
    let view = BoardView::open(Arc::clone(&store), created.board, viewport());

    // Initial render is always pending.
    assert!(view.take_dirty());
    assert!(!view.take_dirty());

    let peer = Arc::new(store.client());
    let peer_controller = BoardController::new(peer, created.board);
    peer_controller.add_note("from a peer").unwrap();

    assert!(view.take_dirty());
}

#[test]
fn remotely_added_notes_appear_after_refresh() {
    let store = Arc::new(MemoryStore::new());
    let created = open_board(&store);
    let mut view = BoardView::open(Arc::clone(&store), created.board, viewport());

    let peer = Arc::new(store.client());
    let peer_controller = BoardController::new(peer, created.board);
    let id = peer_controller.add_note("remote").unwrap();

    view.refresh().unwrap();
    view.begin_edit(id).unwrap();
    view.set_edit_buffer(id, "remote, edited here").unwrap();
    view.save(id).unwrap();

    let snapshot = view.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.notes[0].text, "remote, edited here");
}

#[test]
fn snapshot_serializes_for_export() {
    let store = Arc::new(MemoryStore::new());
    let created = open_board(&store);
    let mut view = BoardView::open(Arc::clone(&store), created.board, viewport());
    view.add_note("exported").unwrap();

    let snapshot = view.snapshot().unwrap().unwrap();
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"notes\""));
    assert!(json.contains("\"exported\""));
}

#[test]
fn snapshot_is_none_for_an_unknown_board() {
    let store = Arc::new(MemoryStore::new());
    let view = BoardView::open(Arc::clone(&store), Uuid::new_v4(), viewport());

    assert!(view.snapshot().unwrap().is_none());
}
