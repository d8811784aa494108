//! Note record model and position math.
//!
//! # Responsibility
//! - Define the canonical shared-record shape for one sticky note.
//! - Map the record to and from store field values.
//! - Convert between percentage positions and absolute pixel positions.
//!
//! # Invariants
//! - `NotePosition` axes are always clamped into `[0, 100]`.
//! - A freshly created note is never in edit mode.

use crate::store::{FieldValue, RecordId, SharedStore, StoreResult};
use serde::{Deserialize, Serialize};

/// Stable identifier for one shared note record.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NoteId = RecordId;

/// Store field key for the note body text.
pub const FIELD_TEXT: &str = "text";
/// Store field key for the horizontal position percentage.
pub const FIELD_X: &str = "x";
/// Store field key for the vertical position percentage.
pub const FIELD_Y: &str = "y";
/// Store field key for the advisory edit-lock flag.
pub const FIELD_IS_BEING_EDITED: &str = "is_being_edited";

const POSITION_MIN_PCT: f64 = 0.0;
const POSITION_MAX_PCT: f64 = 100.0;

/// Measured content box of the board container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Absolute pixel coordinates inside the board container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Note position as percentages of the parent bounds.
///
/// Percentages survive container resizes: the absolute position is
/// recomputed from the stored percentage and the latest measured viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotePosition {
    pub x: f64,
    pub y: f64,
}

impl NotePosition {
    /// Builds a position with both axes clamped into `[0, 100]`.
    ///
    /// NaN input normalizes to the lower bound so a corrupt measurement can
    /// never produce an off-board position.
    pub fn clamped(x: f64, y: f64) -> Self {
        Self {
            x: clamp_pct(x),
            y: clamp_pct(y),
        }
    }

    /// Converts an absolute pointer position into a clamped percentage
    /// position relative to `viewport`.
    ///
    /// A non-positive viewport axis yields `0.0` for that axis.
    pub fn from_pixels(pixels: PixelPoint, viewport: Viewport) -> Self {
        Self {
            x: axis_pct(pixels.x, viewport.width),
            y: axis_pct(pixels.y, viewport.height),
        }
    }

    /// Recomputes the absolute pixel position for the given viewport.
    pub fn to_pixels(self, viewport: Viewport) -> PixelPoint {
        PixelPoint {
            x: self.x / POSITION_MAX_PCT * viewport.width.max(0.0),
            y: self.y / POSITION_MAX_PCT * viewport.height.max(0.0),
        }
    }
}

fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        return POSITION_MIN_PCT;
    }
    value.clamp(POSITION_MIN_PCT, POSITION_MAX_PCT)
}

fn axis_pct(pixels: f64, extent: f64) -> f64 {
    if extent <= 0.0 {
        return POSITION_MIN_PCT;
    }
    clamp_pct(pixels / extent * POSITION_MAX_PCT)
}

/// Canonical shared-record shape for one sticky note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Note body text.
    pub text: String,
    /// Position as percentages of the parent bounds.
    pub position: NotePosition,
    /// Advisory edit-lock flag; see the view layer for its discipline.
    pub is_being_edited: bool,
}

impl Note {
    /// Creates a note record shape with the edit flag cleared.
    pub fn new(text: impl Into<String>, position: NotePosition) -> Self {
        Self {
            text: text.into(),
            position,
            is_being_edited: false,
        }
    }

    /// Disassembles the note into store field writes.
    pub fn to_fields(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            (FIELD_TEXT, FieldValue::Text(self.text.clone())),
            (FIELD_X, FieldValue::Number(self.position.x)),
            (FIELD_Y, FieldValue::Number(self.position.y)),
            (
                FIELD_IS_BEING_EDITED,
                FieldValue::Flag(self.is_being_edited),
            ),
        ]
    }

    /// Loads a note record from the store.
    ///
    /// Returns `Ok(None)` when the record does not exist (removed or not yet
    /// synchronized). Fields that were never written fall back to defaults —
    /// a partially synchronized record is rendered, not rejected. A field
    /// holding the wrong value kind is rejected as invalid data.
    pub fn load<S: SharedStore + ?Sized>(store: &S, id: NoteId) -> StoreResult<Option<Note>> {
        use crate::store::StoreError;

        let text = match store.read_field(id, FIELD_TEXT) {
            Ok(value) => value,
            Err(StoreError::RecordNotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let text = match text {
            Some(value) => value
                .as_text()
                .map(str::to_string)
                .ok_or_else(|| invalid_kind(FIELD_TEXT))?,
            None => String::new(),
        };

        let x = read_number_or_default(store, id, FIELD_X)?;
        let y = read_number_or_default(store, id, FIELD_Y)?;

        let is_being_edited = match store.read_field(id, FIELD_IS_BEING_EDITED)? {
            Some(value) => value
                .as_flag()
                .ok_or_else(|| invalid_kind(FIELD_IS_BEING_EDITED))?,
            None => false,
        };

        Ok(Some(Note {
            text,
            position: NotePosition::clamped(x, y),
            is_being_edited,
        }))
    }
}

fn read_number_or_default<S: SharedStore + ?Sized>(
    store: &S,
    id: NoteId,
    field: &'static str,
) -> StoreResult<f64> {
    match store.read_field(id, field)? {
        Some(value) => value.as_number().ok_or_else(|| invalid_kind(field)),
        None => Ok(0.0),
    }
}

fn invalid_kind(field: &str) -> crate::store::StoreError {
    crate::store::StoreError::InvalidData(format!("field `{field}` holds the wrong value kind"))
}

#[cfg(test)]
mod tests {
    use super::{Note, NotePosition, PixelPoint, Viewport};

    #[test]
    fn clamped_bounds_both_axes() {
        let position = NotePosition::clamped(-3.5, 141.0);
        assert_eq!(position.x, 0.0);
        assert_eq!(position.y, 100.0);

        let inside = NotePosition::clamped(12.25, 99.9);
        assert_eq!(inside.x, 12.25);
        assert_eq!(inside.y, 99.9);
    }

    #[test]
    fn nan_input_normalizes_to_lower_bound() {
        let position = NotePosition::clamped(f64::NAN, 50.0);
        assert_eq!(position.x, 0.0);
        assert_eq!(position.y, 50.0);
    }

    #[test]
    fn pixel_roundtrip_tracks_viewport_resize() {
        let viewport = Viewport::new(800.0, 600.0);
        let position = NotePosition::from_pixels(PixelPoint::new(400.0, 150.0), viewport);
        assert_eq!(position.x, 50.0);
        assert_eq!(position.y, 25.0);

        let resized = Viewport::new(1600.0, 300.0);
        let pixels = position.to_pixels(resized);
        assert_eq!(pixels.x, 800.0);
        assert_eq!(pixels.y, 75.0);
    }

    #[test]
    fn zero_size_viewport_maps_to_origin() {
        let position = NotePosition::from_pixels(
            PixelPoint::new(40.0, 40.0),
            Viewport::new(0.0, -10.0),
        );
        assert_eq!(position.x, 0.0);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn out_of_bounds_pointer_is_clamped() {
        let viewport = Viewport::new(500.0, 500.0);
        let position = NotePosition::from_pixels(PixelPoint::new(650.0, -20.0), viewport);
        assert_eq!(position.x, 100.0);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn new_note_starts_outside_edit_mode() {
        let note = Note::new("hello", NotePosition::clamped(10.0, 20.0));
        assert!(!note.is_being_edited);
        assert_eq!(note.to_fields().len(), 4);
    }
}
