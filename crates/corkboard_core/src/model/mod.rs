//! Domain model for the sticky-notes board.
//!
//! # Responsibility
//! - Define the shared note record shape and its store field mapping.
//! - Keep position math (percentage clamping, pixel conversion) in one place.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Note positions are percentages of the parent bounds in `[0, 100]`.

pub mod note;
