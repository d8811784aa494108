//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - Versions are monotonic and mirrored to `PRAGMA user_version`.
//! - A database newer than this binary is refused, never downgraded.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

const MIGRATIONS: &[(u32, &str)] = &[(1, include_str!("0001_init.sql"))];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let applied: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();
    if applied > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: applied,
            latest_supported: latest,
        });
    }

    let tx = conn.transaction()?;
    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > applied) {
        tx.execute_batch(sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {version};"))?;
    }
    tx.commit()?;
    Ok(())
}
