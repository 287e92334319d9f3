//! SQLite persistence for value chains.
//!
//! Every connection runs with WAL journaling, a 5 s busy timeout and foreign
//! keys enforced: rows and nodes cannot outlive their chain, and a chain's
//! document cannot be removed from under it.

pub mod gateway;
pub mod migrations;
pub mod query;
pub mod schema;
pub mod sqlite;

pub use gateway::ChainStore;
pub use sqlite::SqliteStore;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::{path::Path, time::Duration};

/// How long a connection waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the database file at `path`, creating it and its directory when
/// missing, and bring its schema up to date.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created, a pragma is
/// rejected, or a migration fails.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create directory for {}", path.display()))?;
    }

    let mut conn = Connection::open(path)
        .with_context(|| format!("open value chain store {}", path.display()))?;
    apply_pragmas(&conn).context("set store pragmas")?;
    let version = migrations::migrate(&mut conn).context("migrate store schema")?;
    tracing::debug!(path = %path.display(), version, "opened value chain store");

    Ok(conn)
}

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    // journal_mode answers with the mode actually in effect.
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
}
