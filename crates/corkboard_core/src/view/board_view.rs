//! Board view: reconciliation of rendered notes against the shared store.
//!
//! # Responsibility
//! - Hold the store subscription and re-render signal for one board.
//! - Keep one presentation unit per live note, pruning transient state
//!   when notes are removed locally or remotely.
//! - Produce render-ready snapshots ordered back-to-front.
//!
//! # Invariants
//! - A snapshot is `None` while the board collection has not synchronized
//!   yet (the loading placeholder state).
//! - Removing a note prunes its unit and stacking entry in the same pass.
//! - `close` releases any held edit lock before dropping the subscription.

use crate::model::note::{Note, NoteId, NotePosition, PixelPoint, Viewport};
use crate::service::board::BoardController;
use crate::store::{
    CollectionId, SharedStore, StoreError, StoreResult, SubscriptionId,
};
use crate::view::note_view::{NoteView, NoteViewError};
use crate::view::stacking::StackingOrder;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Render-ready projection of one note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteSnapshot {
    pub id: NoteId,
    pub text: String,
    /// Stored percentage position.
    pub position: NotePosition,
    /// Absolute position for the current viewport.
    pub pixels: PixelPoint,
    pub is_being_edited: bool,
    /// Local stacking rank; baseline `0` for never-promoted notes.
    pub rank: u64,
}

/// Render-ready projection of the whole board, ordered back-to-front.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub notes: Vec<NoteSnapshot>,
}

/// One client's live view of one board.
pub struct BoardView<S: SharedStore> {
    store: Arc<S>,
    controller: BoardController<S>,
    board: CollectionId,
    viewport: Viewport,
    stacking: StackingOrder,
    units: HashMap<NoteId, NoteView<S>>,
    dirty: Arc<AtomicBool>,
    subscription: Option<SubscriptionId>,
}

impl<S: SharedStore> BoardView<S> {
    /// Opens a view over a board and subscribes to store changes.
    ///
    /// Any store mutation marks the view dirty; this board's state is
    /// re-read from the store on the next [`BoardView::refresh`] /
    /// [`BoardView::snapshot`], so one flag per view is enough.
    pub fn open(store: Arc<S>, board: CollectionId, viewport: Viewport) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let signal = Arc::clone(&dirty);
        let subscription = store.subscribe(Arc::new(move |_event| {
            signal.store(true, Ordering::SeqCst);
        }));

        Self {
            controller: BoardController::new(Arc::clone(&store), board),
            store,
            board,
            viewport,
            stacking: StackingOrder::new(),
            units: HashMap::new(),
            dirty,
            subscription: Some(subscription),
        }
    }

    pub fn board(&self) -> CollectionId {
        self.board
    }

    pub fn controller(&self) -> &BoardController<S> {
        &self.controller
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Records the latest measured container size. Pixel positions are
    /// recomputed from stored percentages on the next snapshot; nothing is
    /// written to the store.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Returns and clears the re-render signal.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    /// Reconciles presentation units against the latest collection state.
    ///
    /// Units appear for records added by any client and disappear (with
    /// their stacking entries and any transient edit state) for records
    /// removed by any client.
    pub fn refresh(&mut self) -> StoreResult<()> {
        let items = match self.store.collection_items(self.board) {
            Ok(items) => items,
            // Not synchronized yet; stay in the loading state.
            Err(StoreError::CollectionNotFound(_)) => return Ok(()),
            Err(err) => return Err(err),
        };

        let live: HashSet<NoteId> = items.iter().copied().collect();
        self.units.retain(|id, _| live.contains(id));
        self.stacking.retain(|id| live.contains(&id));

        for id in items {
            if !self.units.contains_key(&id) {
                self.units
                    .insert(id, NoteView::new(Arc::clone(&self.store), id));
            }
        }
        Ok(())
    }

    /// Produces the render-ready board state.
    ///
    /// `Ok(None)` while the board collection is not yet available — the
    /// caller shows a loading placeholder. Notes are ordered back-to-front:
    /// never-promoted notes keep collection order at the baseline, promoted
    /// notes stack by rank.
    pub fn snapshot(&self) -> StoreResult<Option<BoardSnapshot>> {
        let items = match self.store.collection_items(self.board) {
            Ok(items) => items,
            Err(StoreError::CollectionNotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        let mut rows: Vec<(u64, usize, NoteSnapshot)> = Vec::with_capacity(items.len());
        for (index, id) in items.into_iter().enumerate() {
            let Some(note) = Note::load(self.store.as_ref(), id)? else {
                continue;
            };
            let rank = self.stacking.rank(id);
            rows.push((
                rank,
                index,
                NoteSnapshot {
                    id,
                    text: note.text,
                    position: note.position,
                    pixels: note.position.to_pixels(self.viewport),
                    is_being_edited: note.is_being_edited,
                    rank,
                },
            ));
        }
        rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        Ok(Some(BoardSnapshot {
            notes: rows.into_iter().map(|(_, _, row)| row).collect(),
        }))
    }

    /// Drops a new note onto the board and starts rendering it.
    pub fn add_note(&mut self, text: impl Into<String>) -> StoreResult<NoteId> {
        let id = self.controller.add_note(text)?;
        self.units
            .insert(id, NoteView::new(Arc::clone(&self.store), id));
        Ok(id)
    }

    pub fn begin_edit(&mut self, id: NoteId) -> Result<(), NoteViewError> {
        self.unit_mut(id)?.begin_edit()
    }

    pub fn edit_buffer(&self, id: NoteId) -> Result<&str, NoteViewError> {
        self.units
            .get(&id)
            .ok_or(NoteViewError::NoteVanished(id))?
            .edit_buffer()
    }

    pub fn set_edit_buffer(
        &mut self,
        id: NoteId,
        text: impl Into<String>,
    ) -> Result<(), NoteViewError> {
        self.unit_mut(id)?.set_edit_buffer(text)
    }

    pub fn save(&mut self, id: NoteId) -> Result<(), NoteViewError> {
        self.unit_mut(id)?.save()
    }

    pub fn request_delete(&mut self, id: NoteId) -> Result<(), NoteViewError> {
        self.unit_mut(id)?.request_delete()
    }

    pub fn cancel_delete(&mut self, id: NoteId) -> Result<(), NoteViewError> {
        self.unit_mut(id)?.cancel_delete();
        Ok(())
    }

    /// Confirms an armed deletion, removes the note, and prunes all local
    /// transient state keyed by it.
    pub fn confirm_delete(&mut self, id: NoteId) -> Result<bool, NoteViewError> {
        let removed = {
            let unit = self
                .units
                .get_mut(&id)
                .ok_or(NoteViewError::NoteVanished(id))?;
            unit.confirm_delete(&self.controller)?
        };
        self.units.remove(&id);
        self.stacking.prune(id);
        Ok(removed)
    }

    /// Starts a drag, promoting the note to the top of the local stacking
    /// order. Returns the assigned rank.
    pub fn begin_drag(&mut self, id: NoteId) -> Result<u64, NoteViewError> {
        let unit = self
            .units
            .get_mut(&id)
            .ok_or(NoteViewError::NoteVanished(id))?;
        Ok(unit.begin_drag(&mut self.stacking))
    }

    /// Commits one drag movement against the current viewport.
    pub fn drag_to(
        &mut self,
        id: NoteId,
        pointer: PixelPoint,
    ) -> Result<NotePosition, NoteViewError> {
        let viewport = self.viewport;
        self.unit_mut(id)?.drag_to(pointer, viewport)
    }

    pub fn end_drag(&mut self, id: NoteId) -> Result<(), NoteViewError> {
        self.unit_mut(id)?.end_drag();
        Ok(())
    }

    /// Local stacking rank of a note.
    pub fn rank(&self, id: NoteId) -> u64 {
        self.stacking.rank(id)
    }

    /// Tears the view down: unloads every unit (releasing held edit locks
    /// per the unload policy) and drops the store subscription.
    pub fn close(&mut self) {
        for unit in self.units.values_mut() {
            unit.unload();
        }
        self.units.clear();
        if let Some(subscription) = self.subscription.take() {
            self.store.unsubscribe(subscription);
        }
    }

    fn unit_mut(&mut self, id: NoteId) -> Result<&mut NoteView<S>, NoteViewError> {
        self.units
            .get_mut(&id)
            .ok_or(NoteViewError::NoteVanished(id))
    }
}

impl<S: SharedStore> Drop for BoardView<S> {
    fn drop(&mut self) {
        // Close is the orderly path; this only stops a leaked subscription
        // from outliving the view.
        if let Some(subscription) = self.subscription.take() {
            self.store.unsubscribe(subscription);
        }
    }
}
