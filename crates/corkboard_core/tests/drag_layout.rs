use corkboard_core::{
    BoardView, CreatedBoard, Lobby, MemoryStore, NoteViewError, PixelPoint, Router, Viewport,
};
use std::sync::Arc;

fn open_view(viewport: Viewport) -> (Arc<MemoryStore>, CreatedBoard, BoardView<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let mut router = Router::new();
    let created = Lobby::new(Arc::clone(&store))
        .create_board(&mut router)
        .unwrap();
    let view = BoardView::open(Arc::clone(&store), created.board, viewport);
    (store, created, view)
}

#[test]
fn drag_positions_are_clamped_into_percent_bounds() {
    let (_store, _created, mut view) = open_view(Viewport::new(1000.0, 500.0));
    let id = view.add_note("clamped").unwrap();

    view.begin_drag(id).unwrap();
    let position = view.drag_to(id, PixelPoint::new(1500.0, -50.0)).unwrap();
    view.end_drag(id).unwrap();

    assert_eq!(position.x, 100.0);
    assert_eq!(position.y, 0.0);

    let snapshot = view.snapshot().unwrap().unwrap();
    assert_eq!(snapshot.notes[0].position.x, 100.0);
    assert_eq!(snapshot.notes[0].position.y, 0.0);
}

#[test]
fn drag_movement_without_a_drag_is_refused() {
    let (_store, _created, mut view) = open_view(Viewport::new(1000.0, 500.0));
    let id = view.add_note("static").unwrap();

    assert!(matches!(
        view.drag_to(id, PixelPoint::new(10.0, 10.0)).unwrap_err(),
        NoteViewError::NotDragging(_)
    ));
}

#[test]
fn every_drag_movement_is_visible_to_peers() {
    let (store, created, mut view) = open_view(Viewport::new(1000.0, 1000.0));
    let id = view.add_note("shared drag").unwrap();

    let peer = Arc::new(store.client());
    let peer_view = BoardView::open(peer, created.board, Viewport::new(1000.0, 1000.0));

    view.begin_drag(id).unwrap();
    view.drag_to(id, PixelPoint::new(100.0, 100.0)).unwrap();
    let mid = peer_view.snapshot().unwrap().unwrap();
    assert_eq!(mid.notes[0].position.x, 10.0);

    view.drag_to(id, PixelPoint::new(500.0, 250.0)).unwrap();
    view.end_drag(id).unwrap();
    let done = peer_view.snapshot().unwrap().unwrap();
    assert_eq!(done.notes[0].position.x, 50.0);
    assert_eq!(done.notes[0].position.y, 25.0);
}

#[test]
fn resize_recomputes_pixels_from_stored_percentages() {
    let (_store, _created, mut view) = open_view(Viewport::new(500.0, 500.0));
    let id = view.add_note("resized").unwrap();

    view.begin_drag(id).unwrap();
    view.drag_to(id, PixelPoint::new(250.0, 250.0)).unwrap();
    view.end_drag(id).unwrap();

    let before = view.snapshot().unwrap().unwrap();
    assert_eq!(before.notes[0].pixels, PixelPoint::new(250.0, 250.0));

    // Only the displayed pixels move on resize; the stored percentages
    // stay put and nothing is written to the store.
    view.set_viewport(Viewport::new(1000.0, 200.0));
    let after = view.snapshot().unwrap().unwrap();
    assert_eq!(after.notes[0].position.x, 50.0);
    assert_eq!(after.notes[0].position.y, 50.0);
    assert_eq!(after.notes[0].pixels, PixelPoint::new(500.0, 100.0));
}

#[test]
fn drag_start_promotes_the_note_to_the_top() {
    let (_store, _created, mut view) = open_view(Viewport::new(640.0, 480.0));
    let a = view.add_note("a").unwrap();
    let b = view.add_note("b").unwrap();

    // Untouched notes keep collection order as the baseline.
    let baseline = view.snapshot().unwrap().unwrap();
    let order: Vec<_> = baseline.notes.iter().map(|note| note.id).collect();
    assert_eq!(order, vec![a, b]);

    let rank_b = view.begin_drag(b).unwrap();
    view.end_drag(b).unwrap();
    let rank_a = view.begin_drag(a).unwrap();
    view.end_drag(a).unwrap();
    assert!(rank_a > rank_b);

    let stacked = view.snapshot().unwrap().unwrap();
    let order: Vec<_> = stacked.notes.iter().map(|note| note.id).collect();
    assert_eq!(order, vec![b, a]);
}

#[test]
fn rendering_does_not_change_recorded_relative_order() {
    let (_store, _created, mut view) = open_view(Viewport::new(640.0, 480.0));
    let a = view.add_note("a").unwrap();
    let b = view.add_note("b").unwrap();

    view.begin_drag(b).unwrap();
    view.end_drag(b).unwrap();

    let first: Vec<_> = view
        .snapshot()
        .unwrap()
        .unwrap()
        .notes
        .iter()
        .map(|note| note.id)
        .collect();
    let second: Vec<_> = view
        .snapshot()
        .unwrap()
        .unwrap()
        .notes
        .iter()
        .map(|note| note.id)
        .collect();
    assert_eq!(first, second);
    assert_eq!(first, vec![a, b]);
}

#[test]
fn deleting_a_note_prunes_its_stacking_entry() {
    let (_store, _created, mut view) = open_view(Viewport::new(640.0, 480.0));
    let id = view.add_note("short lived").unwrap();

    view.begin_drag(id).unwrap();
    view.end_drag(id).unwrap();
    assert!(view.rank(id) > 0);

    view.request_delete(id).unwrap();
    assert!(view.confirm_delete(id).unwrap());
    assert_eq!(view.rank(id), 0);
}

#[test]
fn remote_removal_prunes_local_state_on_refresh() {
    let (store, created, mut view) = open_view(Viewport::new(640.0, 480.0));
    let id = view.add_note("doomed").unwrap();
    view.begin_drag(id).unwrap();
    view.end_drag(id).unwrap();

    let peer = Arc::new(store.client());
    let peer_controller =
        corkboard_core::BoardController::new(peer, created.board);
    assert!(peer_controller.remove_note(id).unwrap());

    view.refresh().unwrap();
    assert_eq!(view.rank(id), 0);
    assert!(matches!(
        view.begin_edit(id).unwrap_err(),
        NoteViewError::NoteVanished(_)
    ));
}
