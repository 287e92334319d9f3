//! Canonical SQLite schema for valchain.
//!
//! The schema is normalized one table per level of the chain hierarchy:
//! - `documents` holds approval/versioning metadata
//! - `value_chains` references exactly one document (`UNIQUE` FK)
//! - `value_chain_rows` and `value_chain_nodes` carry an explicit `position`
//!   that defines display order among siblings
//! - `store_meta` tracks the applied schema version

/// Migration v1: core normalized tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL CHECK (length(trim(code)) > 0),
    revision TEXT NOT NULL CHECK (length(trim(revision)) > 0),
    date TEXT NOT NULL,
    author TEXT NOT NULL DEFAULT '',
    approver TEXT NOT NULL DEFAULT '',
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS value_chains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    title TEXT NOT NULL,
    document_id INTEGER NOT NULL UNIQUE REFERENCES documents(id) ON DELETE RESTRICT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS value_chain_rows (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    value_chain_id INTEGER NOT NULL REFERENCES value_chains(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS value_chain_nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    row_id INTEGER NOT NULL REFERENCES value_chain_rows(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    text TEXT NOT NULL DEFAULT '',
    description TEXT,
    is_empty INTEGER NOT NULL DEFAULT 1 CHECK (is_empty IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
";

/// Migration v2: read-path indexes for listing and ordered child lookups.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_value_chains_created
    ON value_chains(created_at_us DESC, id DESC);

CREATE INDEX IF NOT EXISTS idx_value_chain_rows_chain_position
    ON value_chain_rows(value_chain_id, position);

CREATE INDEX IF NOT EXISTS idx_value_chain_nodes_row_position
    ON value_chain_nodes(row_id, position);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes expected by list and detail query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_value_chains_created",
    "idx_value_chain_rows_chain_position",
    "idx_value_chain_nodes_row_position",
];

#[cfg(test)]
mod tests {
    use crate::db::migrations;
    use rusqlite::{Connection, params};

    fn seeded_conn() -> rusqlite::Result<Connection> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&mut conn)?;

        for idx in 0..12_i64 {
            conn.execute(
                "INSERT INTO documents (code, revision, date, created_at_us, updated_at_us)
                 VALUES (?1, '01', '2024-05-01', ?2, ?2)",
                params![format!("CV-{idx:02}"), idx],
            )?;
            let document_id = conn.last_insert_rowid();
            conn.execute(
                "INSERT INTO value_chains (name, title, document_id, created_at_us, updated_at_us)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![format!("Chain {idx}"), format!("CHAIN {idx}"), document_id, idx],
            )?;
            let chain_id = conn.last_insert_rowid();
            for position in 0..3_i64 {
                conn.execute(
                    "INSERT INTO value_chain_rows (value_chain_id, position, created_at_us)
                     VALUES (?1, ?2, ?3)",
                    params![chain_id, position, idx],
                )?;
            }
        }

        Ok(conn)
    }

    fn query_plan_details(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}"))?;
        stmt.query_map([], |row| row.get::<_, String>(3))?
            .collect::<Result<Vec<_>, _>>()
    }

    #[test]
    fn query_plan_uses_row_position_index() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let details = query_plan_details(
            &conn,
            "SELECT id FROM value_chain_rows WHERE value_chain_id = 3 ORDER BY position",
        )?;

        assert!(
            details
                .iter()
                .any(|detail| detail.contains("idx_value_chain_rows_chain_position")),
            "expected row position index in plan, got: {details:?}"
        );

        Ok(())
    }

    #[test]
    fn chain_requires_existing_document() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let result = conn.execute(
            "INSERT INTO value_chains (name, title, document_id, created_at_us, updated_at_us)
             VALUES ('Orphan', 'ORPHAN', 9999, 0, 0)",
            [],
        );
        assert!(result.is_err(), "FK to documents must be enforced");
        Ok(())
    }

    #[test]
    fn document_is_referenced_by_one_chain_only() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        let document_id: i64 =
            conn.query_row("SELECT document_id FROM value_chains LIMIT 1", [], |row| {
                row.get(0)
            })?;
        let result = conn.execute(
            "INSERT INTO value_chains (name, title, document_id, created_at_us, updated_at_us)
             VALUES ('Twin', 'TWIN', ?1, 0, 0)",
            params![document_id],
        );
        assert!(result.is_err(), "document_id must be unique per chain");
        Ok(())
    }

    #[test]
    fn deleting_chain_cascades_to_rows() -> rusqlite::Result<()> {
        let conn = seeded_conn()?;
        conn.execute("DELETE FROM value_chains WHERE id = 1", [])?;
        let rows: i64 = conn.query_row(
            "SELECT COUNT(*) FROM value_chain_rows WHERE value_chain_id = 1",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(rows, 0);
        Ok(())
    }
}
