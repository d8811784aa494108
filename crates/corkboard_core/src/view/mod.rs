//! Presentation layer: per-note state machines and board reconciliation.
//!
//! # Responsibility
//! - Manage local-only transient UI state (edit buffers, drag, stacking)
//!   on top of the shared records.
//! - Reconcile the rendered note set against the latest store snapshot.
//!
//! # Invariants
//! - Transient state never enters the shared store.
//! - Transient state keyed by note id is pruned when the note is removed.

pub mod board_view;
pub mod note_view;
pub mod stacking;
