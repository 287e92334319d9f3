//! [`ChainStore`] backed by a rusqlite connection.

use super::gateway::{
    ChainDetails, ChainStore, IssuedIds, NewChain, NodeRecord, RowRecord, StoredChain, SyncPlan,
};
use super::{migrations, open_database, query};
use crate::error::StoreError;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

/// SQLite implementation of the persistence gateway.
///
/// Compound writes (`create_chain`, `delete_chain`, `apply_sync`) each run in
/// a single transaction.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and migrate it.
    ///
    /// # Errors
    ///
    /// Returns an error if opening/configuring/migrating the database fails.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    /// A private in-memory store, migrated and ready.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot create or migrate the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// Wrap an already configured and migrated connection.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Borrow the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl ChainStore for SqliteStore {
    fn create_chain(&mut self, new: &NewChain) -> Result<StoredChain, StoreError> {
        let tx = self.conn.transaction()?;
        let created = query::insert_chain(&tx, new)?;
        tx.commit()?;
        info!(
            chain_id = created.value_chain.id,
            document_id = created.document.id,
            name = %created.value_chain.name,
            "created value chain"
        );
        Ok(created)
    }

    fn list_chains(&self) -> Result<Vec<StoredChain>, StoreError> {
        let chains = query::list_chains(&self.conn)?;
        debug!(count = chains.len(), "listed value chains");
        Ok(chains)
    }

    fn get_chain_details(&self, id: i64) -> Result<ChainDetails, StoreError> {
        let details = query::get_chain_details(&self.conn, id)?;
        debug!(chain_id = id, rows = details.rows.len(), "loaded chain details");
        Ok(details)
    }

    fn create_row(&mut self, chain_id: i64, position: i64) -> Result<RowRecord, StoreError> {
        let row = query::insert_row(&self.conn, chain_id, position)?;
        debug!(chain_id, row_id = row.id, position, "created row");
        Ok(row)
    }

    fn create_node(
        &mut self,
        row_id: i64,
        position: i64,
        text: Option<&str>,
    ) -> Result<NodeRecord, StoreError> {
        let node = query::insert_node(&self.conn, row_id, position, text, None)?;
        debug!(row_id, node_id = node.id, position, "created node");
        Ok(node)
    }

    fn update_node(
        &mut self,
        id: i64,
        text: &str,
        description: Option<&str>,
    ) -> Result<NodeRecord, StoreError> {
        let node = query::update_node(&self.conn, id, text, description)?;
        debug!(node_id = id, is_empty = node.is_empty, "updated node");
        Ok(node)
    }

    fn delete_node(&mut self, id: i64) -> Result<(), StoreError> {
        query::delete_node(&self.conn, id)?;
        debug!(node_id = id, "deleted node");
        Ok(())
    }

    fn delete_row(&mut self, id: i64) -> Result<(), StoreError> {
        query::delete_row(&self.conn, id)?;
        debug!(row_id = id, "deleted row");
        Ok(())
    }

    fn delete_chain(&mut self, id: i64) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        query::delete_chain(&tx, id)?;
        tx.commit()?;
        info!(chain_id = id, "deleted value chain");
        Ok(())
    }

    fn apply_sync(&mut self, chain_id: i64, plan: &SyncPlan) -> Result<IssuedIds, StoreError> {
        let tx = self.conn.transaction()?;
        let issued = query::apply_sync_plan(&tx, chain_id, plan)?;
        tx.commit()?;
        info!(
            chain_id,
            rows_created = plan.create_rows.len(),
            nodes_created = plan.created_node_count(),
            nodes_updated = plan.update_nodes.len(),
            rows_deleted = plan.delete_rows.len(),
            nodes_deleted = plan.delete_nodes.len(),
            "synced value chain"
        );
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::db::gateway::{ChainStore, NewChain};
    use crate::error::{Entity, StoreError};
    use crate::model::DocumentInfo;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("in-memory store")
    }

    fn new_chain(name: &str) -> NewChain {
        NewChain {
            name: name.to_string(),
            title: name.to_uppercase(),
            document: DocumentInfo {
                code: "CV-PA-01".to_string(),
                revision: "01".to_string(),
                date: "2024-03-01".to_string(),
                author: "Ana".to_string(),
                approver: "Bruno".to_string(),
            },
        }
    }

    fn count(store: &SqliteStore, table: &str) -> i64 {
        store
            .connection()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .expect("count rows")
    }

    #[test]
    fn create_chain_returns_matching_document() {
        let mut store = store();
        let created = store.create_chain(&new_chain("Vendas")).expect("create");
        assert_eq!(created.value_chain.name, "Vendas");
        assert_eq!(created.value_chain.title, "VENDAS");
        assert_eq!(created.value_chain.document_id, created.document.id);
        assert_eq!(created.document.info, new_chain("Vendas").document);
    }

    #[test]
    fn failed_chain_insert_leaves_no_document() {
        let mut store = store();
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_chains BEFORE INSERT ON value_chains
                 BEGIN SELECT RAISE(ABORT, 'chain insert rejected'); END;",
            )
            .expect("install trigger");

        let err = store.create_chain(&new_chain("Vendas")).expect_err("insert rejected");
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(count(&store, "documents"), 0);
        assert_eq!(count(&store, "value_chains"), 0);
    }

    #[test]
    fn validation_failure_writes_nothing() {
        let mut store = store();
        let mut input = new_chain("Vendas");
        input.document.code = "  ".to_string();
        let err = store.create_chain(&input).expect_err("blank code");
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(count(&store, "documents"), 0);
    }

    #[test]
    fn create_row_on_missing_chain_is_not_found() {
        let mut store = store();
        let err = store.create_row(42, 0).expect_err("missing chain");
        assert!(matches!(
            err,
            StoreError::NotFound {
                entity: Entity::Chain,
                id: 42
            }
        ));
    }

    #[test]
    fn create_node_derives_is_empty() {
        let mut store = store();
        let chain = store.create_chain(&new_chain("Vendas")).expect("create");
        let row = store.create_row(chain.value_chain.id, 0).expect("row");

        let blank = store.create_node(row.id, 0, Some("   ")).expect("node");
        assert!(blank.is_empty);
        let missing = store.create_node(row.id, 1, None).expect("node");
        assert!(missing.is_empty);
        assert_eq!(missing.text, "");
        let filled = store.create_node(row.id, 2, Some("Entrega")).expect("node");
        assert!(!filled.is_empty);
    }

    #[test]
    fn update_and_delete_missing_node_are_not_found() {
        let mut store = store();
        assert!(matches!(
            store.update_node(5, "x", None),
            Err(StoreError::NotFound {
                entity: Entity::Node,
                ..
            })
        ));
        assert!(matches!(
            store.delete_node(5),
            Err(StoreError::NotFound {
                entity: Entity::Node,
                ..
            })
        ));
        assert!(matches!(
            store.delete_row(5),
            Err(StoreError::NotFound {
                entity: Entity::Row,
                ..
            })
        ));
    }

    #[test]
    fn delete_chain_removes_tree_and_document() {
        let mut store = store();
        let chain = store.create_chain(&new_chain("Vendas")).expect("create");
        let row = store.create_row(chain.value_chain.id, 0).expect("row");
        store.create_node(row.id, 0, Some("A")).expect("node");

        store.delete_chain(chain.value_chain.id).expect("delete");
        for table in ["documents", "value_chains", "value_chain_rows", "value_chain_nodes"] {
            assert_eq!(count(&store, table), 0, "{table} should be empty");
        }
        assert!(matches!(
            store.delete_chain(chain.value_chain.id),
            Err(StoreError::NotFound {
                entity: Entity::Chain,
                ..
            })
        ));
    }
}
