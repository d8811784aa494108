//! Core domain logic for Corkboard, a collaborative sticky-notes board.
//! This crate is the single source of truth for board/note invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod route;
pub mod service;
pub mod store;
pub mod view;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{Note, NoteId, NotePosition, PixelPoint, Viewport};
pub use route::{Route, RouteParseError, Router};
pub use service::board::BoardController;
pub use service::lobby::{CreatedBoard, Lobby};
pub use store::memory::MemoryStore;
pub use store::sqlite::SqliteStore;
pub use store::{
    ClientId, CollectionId, FieldValue, GroupId, Permission, RecordId, Role, SharedStore,
    StoreError, StoreEvent, StoreObserver, StoreResult, SubscriptionId,
};
pub use view::board_view::{BoardSnapshot, BoardView, NoteSnapshot};
pub use view::note_view::{NoteView, NoteViewError};
pub use view::stacking::StackingOrder;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
