//! Per-note presentation state machine.
//!
//! # Responsibility
//! - Drive the `Viewing <-> Editing` transitions against the shared
//!   edit-lock flag.
//! - Commit drag movement as clamped percentage writes.
//! - Gate deletion behind the edit-lock and an explicit confirmation step.
//!
//! # Invariants
//! - The edit buffer and drag state are local-only and never synchronized.
//! - `is_being_edited` transitions `false -> true` only via `begin_edit`
//!   and `true -> false` only via `save` or `unload`.
//! - The edit-lock is advisory: `begin_edit` reads the flag and writes it
//!   in two store calls, so two clients racing within the propagation
//!   window can both enter edit mode. This is a documented property of the
//!   design, not a defect to patch here.

use crate::model::note::{
    Note, NoteId, NotePosition, PixelPoint, Viewport, FIELD_IS_BEING_EDITED, FIELD_TEXT, FIELD_X,
    FIELD_Y,
};
use crate::service::board::BoardController;
use crate::store::{FieldValue, SharedStore, StoreError};
use crate::view::stacking::StackingOrder;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Local edit state of one note presentation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EditState {
    Viewing,
    Editing { buffer: String },
}

/// Presentation-layer errors for note interactions.
#[derive(Debug)]
pub enum NoteViewError {
    /// The shared edit flag is already set (here or on another client).
    EditLocked(NoteId),
    /// Buffer access or save outside of edit mode.
    NotEditing(NoteId),
    /// Drag movement without an active drag.
    NotDragging(NoteId),
    /// Confirmation without a prior delete request.
    DeleteNotRequested(NoteId),
    /// The shared record disappeared underneath this unit.
    NoteVanished(NoteId),
    /// Shared-store failure.
    Store(StoreError),
}

impl Display for NoteViewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EditLocked(id) => write!(f, "note is being edited: {id}"),
            Self::NotEditing(id) => write!(f, "note is not in edit mode: {id}"),
            Self::NotDragging(id) => write!(f, "note has no active drag: {id}"),
            Self::DeleteNotRequested(id) => {
                write!(f, "deletion was not requested for note: {id}")
            }
            Self::NoteVanished(id) => write!(f, "note no longer exists: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteViewError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for NoteViewError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// One rendered note: shared record plus local transient state.
pub struct NoteView<S: SharedStore> {
    store: Arc<S>,
    note: NoteId,
    state: EditState,
    delete_armed: bool,
    dragging: bool,
}

impl<S: SharedStore> NoteView<S> {
    pub fn new(store: Arc<S>, note: NoteId) -> Self {
        Self {
            store,
            note,
            state: EditState::Viewing,
            delete_armed: false,
            dragging: false,
        }
    }

    pub fn note_id(&self) -> NoteId {
        self.note
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    pub fn delete_armed(&self) -> bool {
        self.delete_armed
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Enters edit mode, seeding the local buffer from the shared text.
    ///
    /// Guarded by the shared `is_being_edited` flag; when the flag is
    /// already set the transition is refused. The guard is best-effort
    /// only — see the module invariants.
    pub fn begin_edit(&mut self) -> Result<(), NoteViewError> {
        let note = self.load_note()?;
        if note.is_being_edited {
            return Err(NoteViewError::EditLocked(self.note));
        }

        self.store
            .write_field(self.note, FIELD_IS_BEING_EDITED, FieldValue::Flag(true))?;
        self.state = EditState::Editing { buffer: note.text };
        debug!("event=edit_begin module=view note={}", self.note);
        Ok(())
    }

    /// Current local edit buffer.
    pub fn edit_buffer(&self) -> Result<&str, NoteViewError> {
        match &self.state {
            EditState::Editing { buffer } => Ok(buffer.as_str()),
            EditState::Viewing => Err(NoteViewError::NotEditing(self.note)),
        }
    }

    /// Replaces the local edit buffer. Nothing is written to the store
    /// until [`NoteView::save`].
    pub fn set_edit_buffer(&mut self, text: impl Into<String>) -> Result<(), NoteViewError> {
        match &mut self.state {
            EditState::Editing { buffer } => {
                *buffer = text.into();
                Ok(())
            }
            EditState::Viewing => Err(NoteViewError::NotEditing(self.note)),
        }
    }

    /// Commits the buffer into shared `text` and releases the edit lock.
    pub fn save(&mut self) -> Result<(), NoteViewError> {
        let EditState::Editing { buffer } = &self.state else {
            return Err(NoteViewError::NotEditing(self.note));
        };

        self.store
            .write_field(self.note, FIELD_TEXT, FieldValue::Text(buffer.clone()))?;
        self.store
            .write_field(self.note, FIELD_IS_BEING_EDITED, FieldValue::Flag(false))?;
        self.state = EditState::Viewing;
        debug!("event=edit_save module=view note={}", self.note);
        Ok(())
    }

    /// Arms deletion. Refused while this note is under the edit lock,
    /// locally or on any other client.
    pub fn request_delete(&mut self) -> Result<(), NoteViewError> {
        if self.is_editing() {
            return Err(NoteViewError::EditLocked(self.note));
        }
        if self.load_note()?.is_being_edited {
            return Err(NoteViewError::EditLocked(self.note));
        }
        self.delete_armed = true;
        Ok(())
    }

    /// Drops a pending delete request.
    pub fn cancel_delete(&mut self) {
        self.delete_armed = false;
    }

    /// Confirms a previously armed deletion and removes the note.
    ///
    /// Returns whether the note was still present on the board.
    pub fn confirm_delete(
        &mut self,
        controller: &BoardController<S>,
    ) -> Result<bool, NoteViewError> {
        if !self.delete_armed {
            return Err(NoteViewError::DeleteNotRequested(self.note));
        }
        self.delete_armed = false;
        Ok(controller.remove_note(self.note)?)
    }

    /// Starts a drag and promotes the note to the top of the local
    /// stacking order. Returns the assigned rank.
    pub fn begin_drag(&mut self, stacking: &mut StackingOrder) -> u64 {
        self.dragging = true;
        stacking.bring_to_front(self.note)
    }

    /// Commits one drag movement.
    ///
    /// The pointer position is converted to percentages of the viewport
    /// content box, clamped to `[0, 100]`, and written to the shared
    /// record immediately — each movement is a separate field-granular
    /// write.
    pub fn drag_to(
        &mut self,
        pointer: PixelPoint,
        viewport: Viewport,
    ) -> Result<NotePosition, NoteViewError> {
        if !self.dragging {
            return Err(NoteViewError::NotDragging(self.note));
        }

        let position = NotePosition::from_pixels(pointer, viewport);
        self.store
            .write_field(self.note, FIELD_X, FieldValue::Number(position.x))?;
        self.store
            .write_field(self.note, FIELD_Y, FieldValue::Number(position.y))?;
        Ok(position)
    }

    /// Ends the drag; every movement was already committed.
    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Tears this unit down when its view goes away.
    ///
    /// Adopted unload policy: a held edit lock is released and the local
    /// buffer is discarded without saving. The release is best-effort —
    /// a store failure during teardown is logged, not propagated.
    pub fn unload(&mut self) {
        self.dragging = false;
        self.delete_armed = false;
        if !self.is_editing() {
            return;
        }

        self.state = EditState::Viewing;
        if let Err(err) =
            self.store
                .write_field(self.note, FIELD_IS_BEING_EDITED, FieldValue::Flag(false))
        {
            warn!(
                "event=edit_lock_release module=view status=error note={} error={err}",
                self.note
            );
        } else {
            debug!("event=edit_unload module=view note={}", self.note);
        }
    }

    fn load_note(&self) -> Result<Note, NoteViewError> {
        Note::load(self.store.as_ref(), self.note)?
            .ok_or(NoteViewError::NoteVanished(self.note))
    }
}
