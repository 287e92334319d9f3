//! Versioned schema upgrades for the value chain store.
//!
//! `PRAGMA user_version` is the source of truth; `store_meta.schema_version`
//! mirrors it for tools that only read tables.

use super::schema;
use rusqlite::{Connection, types::Type};

/// Latest schema version understood by this binary.
pub const LATEST_SCHEMA_VERSION: u32 = 2;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "chain tables",
        sql: schema::MIGRATION_V1_SQL,
    },
    Migration {
        version: 2,
        name: "list and position indexes",
        sql: schema::MIGRATION_V2_SQL,
    },
];

/// Schema version recorded in the database file.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or holds a negative value.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(err)))
}

/// Bring the schema to [`LATEST_SCHEMA_VERSION`] and return the version the
/// file ends at. A file written by a newer binary is left untouched.
///
/// # Errors
///
/// Returns an error if a migration fails; that migration is rolled back and
/// the file stays at the previous version.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let start = current_schema_version(conn)?;
    let mut version = start;

    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", i64::from(migration.version))?;
        tx.execute(
            "UPDATE store_meta SET schema_version = ?1 WHERE id = 1",
            [i64::from(migration.version)],
        )?;
        tx.commit()?;
        tracing::debug!(version = migration.version, name = migration.name, "migrated store schema");
        version = migration.version;
    }

    Ok(version)
}
