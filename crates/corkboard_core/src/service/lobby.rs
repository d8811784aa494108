//! Lobby: board creation and navigation.
//!
//! # Responsibility
//! - Create a new board with an open-write permission group.
//! - Navigate the caller's router to the new board.
//!
//! # Invariants
//! - Every created board is owned by a fresh group carrying an
//!   `Everyone -> Writer` grant, so any connected client can post notes.

use crate::route::{Route, Router};
use crate::store::{CollectionId, GroupId, Permission, Role, SharedStore, StoreResult};
use log::info;
use std::sync::Arc;

/// Result of a successful board creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedBoard {
    /// The new board collection.
    pub board: CollectionId,
    /// The owning permission group.
    pub group: GroupId,
    /// Route the caller navigated to.
    pub route: Route,
}

/// Board selection entry point.
pub struct Lobby<S: SharedStore> {
    store: Arc<S>,
}

impl<S: SharedStore> Lobby<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a board open to every connected client and navigates to it.
    ///
    /// Store failures propagate unchanged; there is no retry.
    pub fn create_board(&self, router: &mut Router) -> StoreResult<CreatedBoard> {
        let group = self.store.create_group()?;
        self.store
            .add_group_member(group, Role::Everyone, Permission::Writer)?;
        let board = self.store.create_collection(group)?;

        let route = Route::Board(board);
        router.navigate(route);
        info!("event=board_created module=lobby board={board} group={group}");

        Ok(CreatedBoard {
            board,
            group,
            route,
        })
    }
}
