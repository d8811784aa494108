//! Board controller.
//!
//! # Responsibility
//! - Own add/remove operations on one board's shared note collection.
//! - Assign random initial placement to freshly dropped notes.
//!
//! # Invariants
//! - New notes are created with the edit flag cleared, owned by the board's
//!   owner group.
//! - Removal by identity is a no-op when the note is absent and preserves
//!   the relative order of the surviving notes.
//! - Callers owning transient per-note UI state (stacking rank, edit
//!   buffers) must prune it after a removal.

use crate::model::note::{Note, NoteId, NotePosition};
use crate::store::{CollectionId, SharedStore, StoreResult};
use log::info;
use rand::Rng;
use std::sync::Arc;

// Upper placement bound leaves room for the note body inside the board,
// mirroring the pixel margin the board UI subtracts from its extent.
const PLACEMENT_MAX_PCT: f64 = 90.0;

/// Add/remove facade over one board's shared note collection.
pub struct BoardController<S: SharedStore> {
    store: Arc<S>,
    board: CollectionId,
}

impl<S: SharedStore> BoardController<S> {
    /// Creates a controller for an existing board collection.
    pub fn new(store: Arc<S>, board: CollectionId) -> Self {
        Self { store, board }
    }

    /// Board collection this controller operates on.
    pub fn board(&self) -> CollectionId {
        self.board
    }

    /// Drops a new note onto the board.
    ///
    /// # Contract
    /// - Placement is uniform over `[0, 90]` percent per axis.
    /// - The record is owned by the board's owner group.
    /// - `is_being_edited` starts `false`.
    /// - Returns the stable note id after appending to the collection.
    pub fn add_note(&self, text: impl Into<String>) -> StoreResult<NoteId> {
        let owner = self.store.collection_owner(self.board)?;
        let note = Note::new(text, random_placement());
        let id = self.store.create_record(owner, &note.to_fields())?;
        self.store.append_to_collection(self.board, id)?;
        info!(
            "event=note_added module=board board={} note={id}",
            self.board
        );
        Ok(id)
    }

    /// Removes a note by identity.
    ///
    /// Returns `Ok(false)` without touching the collection when no note with
    /// that id is present.
    pub fn remove_note(&self, id: NoteId) -> StoreResult<bool> {
        let items = self.store.collection_items(self.board)?;
        let Some(index) = items.iter().position(|candidate| *candidate == id) else {
            return Ok(false);
        };
        self.store.remove_from_collection(self.board, index)?;
        info!(
            "event=note_removed module=board board={} note={id}",
            self.board
        );
        Ok(true)
    }

    /// Snapshot of note ids in collection order.
    pub fn note_ids(&self) -> StoreResult<Vec<NoteId>> {
        self.store.collection_items(self.board)
    }

    /// Number of notes currently on the board.
    pub fn note_count(&self) -> StoreResult<usize> {
        Ok(self.store.collection_items(self.board)?.len())
    }
}

fn random_placement() -> NotePosition {
    let mut rng = rand::rng();
    NotePosition::clamped(
        rng.random_range(0.0..=PLACEMENT_MAX_PCT),
        rng.random_range(0.0..=PLACEMENT_MAX_PCT),
    )
}
