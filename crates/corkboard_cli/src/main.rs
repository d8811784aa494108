//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `corkboard_core` linkage.
//! - Walk the lobby -> board -> note path once for quick local sanity
//!   checks.

use corkboard_core::{BoardView, Lobby, MemoryStore, Router, Viewport};
use std::error::Error;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    println!("corkboard_core version={}", corkboard_core::core_version());

    let store = Arc::new(MemoryStore::new());
    let mut router = Router::new();
    let created = Lobby::new(Arc::clone(&store)).create_board(&mut router)?;

    let mut view = BoardView::open(store, created.board, Viewport::new(1280.0, 720.0));
    view.add_note("hello from the cli")?;
    view.refresh()?;
    let snapshot = view.snapshot()?.ok_or("board not available")?;
    println!("board notes={}", snapshot.notes.len());

    view.close();
    Ok(())
}
