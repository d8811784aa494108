//! Use-case services over the shared store.
//!
//! # Responsibility
//! - Provide board and lobby entry points for callers.
//! - Delegate all shared-state mutation to store implementations.

pub mod board;
pub mod lobby;
