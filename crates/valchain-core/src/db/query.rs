//! `SQLite` statements behind the gateway.
//!
//! All functions take a shared `&Connection` so they run the same way on a
//! plain connection or inside a `Transaction` (which derefs to one), and
//! return typed records (never raw rows).

use super::gateway::{
    ChainDetails, ChainRecord, Document, IssuedIds, NewChain, NewNode, NodeRecord, RowRecord,
    RowWithNodes, StoredChain, SyncPlan,
};
use crate::error::{Entity, StoreError};
use crate::model::{DocumentInfo, text_is_empty};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;

const CHAIN_WITH_DOCUMENT_COLUMNS: &str = "c.id, c.name, c.title, c.document_id, \
     c.created_at_us, c.updated_at_us, \
     d.id, d.code, d.revision, d.date, d.author, d.approver, d.created_at_us";

const NODE_COLUMNS: &str =
    "id, row_id, position, text, description, is_empty, created_at_us, updated_at_us";

fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

// ---------------------------------------------------------------------------
// Row mappers
// ---------------------------------------------------------------------------

fn row_to_stored_chain(row: &Row<'_>) -> rusqlite::Result<StoredChain> {
    Ok(StoredChain {
        value_chain: ChainRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            title: row.get(2)?,
            document_id: row.get(3)?,
            created_at_us: row.get(4)?,
            updated_at_us: row.get(5)?,
        },
        document: Document {
            id: row.get(6)?,
            info: DocumentInfo {
                code: row.get(7)?,
                revision: row.get(8)?,
                date: row.get(9)?,
                author: row.get(10)?,
                approver: row.get(11)?,
            },
            created_at_us: row.get(12)?,
        },
    })
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<NodeRecord> {
    let is_empty: i64 = row.get(5)?;
    Ok(NodeRecord {
        id: row.get(0)?,
        row_id: row.get(1)?,
        position: row.get(2)?,
        text: row.get(3)?,
        description: row.get(4)?,
        is_empty: is_empty != 0,
        created_at_us: row.get(6)?,
        updated_at_us: row.get(7)?,
    })
}

fn row_to_row_record(row: &Row<'_>) -> rusqlite::Result<RowRecord> {
    Ok(RowRecord {
        id: row.get(0)?,
        value_chain_id: row.get(1)?,
        position: row.get(2)?,
        created_at_us: row.get(3)?,
    })
}

fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool, StoreError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
    Ok(conn.query_row(&sql, params![id], |row| row.get(0))?)
}

// ---------------------------------------------------------------------------
// Chains
// ---------------------------------------------------------------------------

/// Insert the document, then the chain that references it.
///
/// Callers wanting both-or-neither must run this inside a transaction.
///
/// # Errors
///
/// Returns a validation error before writing anything, or the first storage
/// failure.
pub fn insert_chain(conn: &Connection, new: &NewChain) -> Result<StoredChain, StoreError> {
    new.validate()?;
    let now = now_us();

    conn.execute(
        "INSERT INTO documents (code, revision, date, author, approver, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            new.document.code,
            new.document.revision,
            new.document.date.trim(),
            new.document.author,
            new.document.approver,
            now
        ],
    )?;
    let document_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO value_chains (name, title, document_id, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![new.name, new.title, document_id, now],
    )?;
    let chain_id = conn.last_insert_rowid();

    get_chain(conn, chain_id)?.ok_or_else(|| StoreError::not_found(Entity::Chain, chain_id))
}

/// Fetch one chain joined with its document.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_chain(conn: &Connection, id: i64) -> Result<Option<StoredChain>, StoreError> {
    let sql = format!(
        "SELECT {CHAIN_WITH_DOCUMENT_COLUMNS} \
         FROM value_chains c \
         INNER JOIN documents d ON d.id = c.document_id \
         WHERE c.id = ?1"
    );
    Ok(conn
        .query_row(&sql, params![id], row_to_stored_chain)
        .optional()?)
}

/// List chains with their documents, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_chains(conn: &Connection) -> Result<Vec<StoredChain>, StoreError> {
    let sql = format!(
        "SELECT {CHAIN_WITH_DOCUMENT_COLUMNS} \
         FROM value_chains c \
         INNER JOIN documents d ON d.id = c.document_id \
         ORDER BY c.created_at_us DESC, c.id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_stored_chain)?;

    let mut chains = Vec::new();
    for row in rows {
        chains.push(row?);
    }
    Ok(chains)
}

/// Fetch a chain with its rows (ascending position) and each row's nodes
/// (ascending position).
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the chain does not exist.
pub fn get_chain_details(conn: &Connection, id: i64) -> Result<ChainDetails, StoreError> {
    let StoredChain {
        value_chain,
        document,
    } = get_chain(conn, id)?.ok_or_else(|| StoreError::not_found(Entity::Chain, id))?;

    let mut stmt = conn.prepare(
        "SELECT id, value_chain_id, position, created_at_us \
         FROM value_chain_rows WHERE value_chain_id = ?1 \
         ORDER BY position ASC, id ASC",
    )?;
    let row_records = stmt
        .query_map(params![id], row_to_row_record)?
        .collect::<Result<Vec<_>, _>>()?;

    let node_sql = format!(
        "SELECT n.{} FROM value_chain_nodes n \
         INNER JOIN value_chain_rows r ON r.id = n.row_id \
         WHERE r.value_chain_id = ?1 \
         ORDER BY n.row_id, n.position ASC, n.id ASC",
        NODE_COLUMNS.replace(", ", ", n.")
    );
    let mut stmt = conn.prepare(&node_sql)?;
    let mut nodes_by_row: HashMap<i64, Vec<NodeRecord>> = HashMap::new();
    for node in stmt.query_map(params![id], row_to_node)? {
        let node = node?;
        nodes_by_row.entry(node.row_id).or_default().push(node);
    }

    let rows = row_records
        .into_iter()
        .map(|row| RowWithNodes {
            nodes: nodes_by_row.remove(&row.id).unwrap_or_default(),
            row,
        })
        .collect();

    Ok(ChainDetails {
        value_chain,
        document,
        rows,
    })
}

/// Delete a chain, its rows and nodes (cascade) and its document.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the chain does not exist.
pub fn delete_chain(conn: &Connection, id: i64) -> Result<(), StoreError> {
    let document_id: Option<i64> = conn
        .query_row(
            "SELECT document_id FROM value_chains WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let document_id = document_id.ok_or_else(|| StoreError::not_found(Entity::Chain, id))?;

    conn.execute("DELETE FROM value_chains WHERE id = ?1", params![id])?;
    conn.execute("DELETE FROM documents WHERE id = ?1", params![document_id])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Rows and nodes
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`StoreError::NotFound`] if the chain does not exist.
pub fn insert_row(conn: &Connection, chain_id: i64, position: i64) -> Result<RowRecord, StoreError> {
    if !exists(conn, "value_chains", chain_id)? {
        return Err(StoreError::not_found(Entity::Chain, chain_id));
    }
    let now = now_us();
    conn.execute(
        "INSERT INTO value_chain_rows (value_chain_id, position, created_at_us)
         VALUES (?1, ?2, ?3)",
        params![chain_id, position, now],
    )?;
    Ok(RowRecord {
        id: conn.last_insert_rowid(),
        value_chain_id: chain_id,
        position,
        created_at_us: now,
    })
}

/// Insert a node; `is_empty` is derived from the trimmed text.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the row does not exist.
pub fn insert_node(
    conn: &Connection,
    row_id: i64,
    position: i64,
    text: Option<&str>,
    description: Option<&str>,
) -> Result<NodeRecord, StoreError> {
    if !exists(conn, "value_chain_rows", row_id)? {
        return Err(StoreError::not_found(Entity::Row, row_id));
    }
    let text = text.unwrap_or_default();
    let is_empty = text_is_empty(text);
    let now = now_us();
    conn.execute(
        "INSERT INTO value_chain_nodes
            (row_id, position, text, description, is_empty, created_at_us, updated_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![row_id, position, text, description, is_empty, now],
    )?;
    Ok(NodeRecord {
        id: conn.last_insert_rowid(),
        row_id,
        position,
        text: text.to_string(),
        description: description.map(str::to_string),
        is_empty,
        created_at_us: now,
        updated_at_us: now,
    })
}

/// # Errors
///
/// Returns an error if the query fails.
pub fn get_node(conn: &Connection, id: i64) -> Result<Option<NodeRecord>, StoreError> {
    let sql = format!("SELECT {NODE_COLUMNS} FROM value_chain_nodes WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_node).optional()?)
}

/// Replace text and description; `is_empty` is recomputed.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the node does not exist.
pub fn update_node(
    conn: &Connection,
    id: i64,
    text: &str,
    description: Option<&str>,
) -> Result<NodeRecord, StoreError> {
    let changed = conn.execute(
        "UPDATE value_chain_nodes
         SET text = ?2, description = ?3, is_empty = ?4, updated_at_us = ?5
         WHERE id = ?1",
        params![id, text, description, text_is_empty(text), now_us()],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found(Entity::Node, id));
    }
    get_node(conn, id)?.ok_or_else(|| StoreError::not_found(Entity::Node, id))
}

/// # Errors
///
/// Returns [`StoreError::NotFound`] if the node does not exist.
pub fn delete_node(conn: &Connection, id: i64) -> Result<(), StoreError> {
    let changed = conn.execute("DELETE FROM value_chain_nodes WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(StoreError::not_found(Entity::Node, id));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`StoreError::NotFound`] if the row does not exist.
pub fn delete_row(conn: &Connection, id: i64) -> Result<(), StoreError> {
    let changed = conn.execute("DELETE FROM value_chain_rows WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(StoreError::not_found(Entity::Row, id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sync plans
// ---------------------------------------------------------------------------

/// Apply every write in `plan`, in plan order.
///
/// Not atomic on its own; run inside a transaction for all-or-nothing.
///
/// # Errors
///
/// Returns the first failing write.
pub fn apply_sync_plan(
    conn: &Connection,
    chain_id: i64,
    plan: &SyncPlan,
) -> Result<IssuedIds, StoreError> {
    let mut issued = IssuedIds::default();

    for id in &plan.delete_nodes {
        delete_node(conn, *id)?;
    }
    for id in &plan.delete_rows {
        delete_row(conn, *id)?;
    }
    for update in &plan.update_nodes {
        update_node(conn, update.id, &update.text, update.description.as_deref())?;
    }
    for new_row in &plan.create_rows {
        let row = insert_row(conn, chain_id, new_row.position)?;
        issued.rows.push((new_row.local, row.id));
        for node in &new_row.nodes {
            issued.nodes.push((node.local, insert_new_node(conn, row.id, node)?));
        }
    }
    for pending in &plan.create_nodes {
        issued
            .nodes
            .push((pending.node.local, insert_new_node(conn, pending.row_id, &pending.node)?));
    }

    Ok(issued)
}

fn insert_new_node(conn: &Connection, row_id: i64, node: &NewNode) -> Result<i64, StoreError> {
    insert_node(
        conn,
        row_id,
        node.position,
        Some(&node.text),
        node.description.as_deref(),
    )
    .map(|record| record.id)
}
