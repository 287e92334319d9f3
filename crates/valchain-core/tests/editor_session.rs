use valchain_core::db::SqliteStore;
use valchain_core::db::gateway::{
    ChainDetails, ChainStore, NewChain, NodeRecord, RowRecord, StoredChain,
};
use valchain_core::editor::{EditorError, EditorSession, ExportFormat, SessionState};
use valchain_core::error::{ErrorCode, StoreError};
use valchain_core::model::{Chain, DocumentInfo, LocalId, Node, PositionOverflow};

fn document() -> DocumentInfo {
    DocumentInfo {
        code: "CV-PA-01".to_string(),
        revision: "01".to_string(),
        date: "2024-03-01".to_string(),
        author: "Ana".to_string(),
        approver: String::new(),
    }
}

/// Saves a three-node "Vendas" chain and returns its id.
fn seed(store: &mut impl ChainStore) -> i64 {
    let mut session = EditorSession::new();
    session.new_chain("Vendas", document(), 3);
    session.save(store).expect("seed save").chain_id
}

fn count(store: &SqliteStore, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("count")
}

fn stored_texts(store: &SqliteStore) -> Vec<String> {
    let mut stmt = store
        .connection()
        .prepare("SELECT text FROM value_chain_nodes ORDER BY id")
        .expect("prepare");
    let texts = stmt
        .query_map([], |row| row.get(0))
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("texts");
    texts
}

fn reject_node_inserts(store: &SqliteStore) {
    store
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_nodes BEFORE INSERT ON value_chain_nodes
             BEGIN SELECT RAISE(ABORT, 'node insert rejected'); END;",
        )
        .expect("install trigger");
}

fn positions(nodes: &[Node]) -> Vec<i64> {
    nodes.iter().map(Node::position).collect()
}

fn assert_strictly_ascending(values: &[i64]) {
    assert!(
        values.windows(2).all(|pair| pair[0] < pair[1]),
        "not strictly ascending: {values:?}"
    );
}

/// Store wrapper that can be told to fail specific calls. It keeps the
/// default `apply_sync`, so saves go through the singleton primitives.
struct FlakyStore {
    inner: SqliteStore,
    fail_details: bool,
    fail_create_node: bool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().expect("store"),
            fail_details: false,
            fail_create_node: false,
        }
    }
}

fn injected() -> StoreError {
    StoreError::Storage(rusqlite::Error::InvalidQuery)
}

impl ChainStore for FlakyStore {
    fn create_chain(&mut self, new: &NewChain) -> Result<StoredChain, StoreError> {
        self.inner.create_chain(new)
    }

    fn list_chains(&self) -> Result<Vec<StoredChain>, StoreError> {
        self.inner.list_chains()
    }

    fn get_chain_details(&self, id: i64) -> Result<ChainDetails, StoreError> {
        if self.fail_details {
            return Err(injected());
        }
        self.inner.get_chain_details(id)
    }

    fn create_row(&mut self, chain_id: i64, position: i64) -> Result<RowRecord, StoreError> {
        self.inner.create_row(chain_id, position)
    }

    fn create_node(
        &mut self,
        row_id: i64,
        position: i64,
        text: Option<&str>,
    ) -> Result<NodeRecord, StoreError> {
        if self.fail_create_node {
            return Err(injected());
        }
        self.inner.create_node(row_id, position, text)
    }

    fn update_node(
        &mut self,
        id: i64,
        text: &str,
        description: Option<&str>,
    ) -> Result<NodeRecord, StoreError> {
        self.inner.update_node(id, text, description)
    }

    fn delete_node(&mut self, id: i64) -> Result<(), StoreError> {
        self.inner.delete_node(id)
    }

    fn delete_row(&mut self, id: i64) -> Result<(), StoreError> {
        self.inner.delete_row(id)
    }

    fn delete_chain(&mut self, id: i64) -> Result<(), StoreError> {
        self.inner.delete_chain(id)
    }
}

#[test]
fn vendas_add_node_keeps_nodes_empty_and_ordered() {
    let mut store = SqliteStore::open_in_memory().expect("store");
    let id = seed(&mut store);

    let mut session = EditorSession::new();
    let row_id = session.load_details(&store, id).expect("load").rows()[0].id();
    assert_eq!(session.current().expect("chain").rows()[0].nodes().len(), 3);

    session.add_node_to_row(row_id).expect("add node");

    let nodes = session.current().expect("chain").rows()[0].nodes().to_vec();
    assert_eq!(nodes.len(), 4);
    assert!(nodes.iter().all(Node::is_empty));
    assert_strictly_ascending(&positions(&nodes));
}

#[test]
fn updating_second_node_leaves_others_untouched() {
    let mut store = SqliteStore::open_in_memory().expect("store");
    let id = seed(&mut store);

    let mut session = EditorSession::new();
    let before = session.load_details(&store, id).expect("load").clone();
    let target = before.rows()[0].nodes()[1].id();

    let node = session
        .update_node(target, "Aprovação", None)
        .expect("update");
    assert!(!node.is_empty());
    assert_eq!(node.text(), "Aprovação");

    let after = session.current().expect("chain");
    for (index, (old, new)) in before.rows()[0]
        .nodes()
        .iter()
        .zip(after.rows()[0].nodes())
        .enumerate()
    {
        if index != 1 {
            assert_eq!(old, new, "node {index} changed");
        }
    }
}

#[test]
fn load_details_twice_yields_identical_trees() {
    let mut store = SqliteStore::open_in_memory().expect("store");
    let id = seed(&mut store);

    let mut session = EditorSession::new();
    let first = session.load_details(&store, id).expect("first").clone();
    let second = session.load_details(&store, id).expect("second").clone();
    assert_eq!(first, second);
}

#[test]
fn deleting_an_empty_row_succeeds() {
    let mut store = SqliteStore::open_in_memory().expect("store");
    let id = seed(&mut store);

    let mut session = EditorSession::new();
    session.load_details(&store, id).expect("load");
    let row_id = session.add_row().expect("row");
    let only_node = session
        .current()
        .and_then(|chain| chain.row(row_id))
        .expect("new row")
        .nodes()[0]
        .id();

    session.delete_node(only_node).expect("delete node");
    let row = session
        .current()
        .and_then(|chain| chain.row(row_id))
        .expect("row survives");
    assert!(row.nodes().is_empty());

    session.delete_row(row_id).expect("delete empty row");
    assert_eq!(session.current().expect("chain").rows().len(), 1);
    assert!(matches!(
        session.delete_row(row_id),
        Err(EditorError::RowNotFound(_))
    ));
}

#[test]
fn failed_load_keeps_previous_tree() {
    let mut store = FlakyStore::new();
    let id = seed(&mut store);

    let mut session = EditorSession::new();
    let loaded = session.load_details(&store, id).expect("load").clone();

    store.fail_details = true;
    let err = session.load_details(&store, id).expect_err("injected");
    assert_eq!(err.code(), ErrorCode::StorageFailure);
    assert_eq!(session.current(), Some(&loaded));
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn failed_draft_save_rolls_back_and_keeps_tree() {
    let mut store = FlakyStore::new();
    store.fail_create_node = true;

    let mut session = EditorSession::new();
    let draft = session.new_chain("Vendas", document(), 3).clone();

    session.save(&mut store).expect_err("injected");
    assert_eq!(session.current(), Some(&draft));
    assert_eq!(session.state(), SessionState::Editing);
    assert!(store.list_chains().expect("list").is_empty());
}

#[test]
fn failed_sync_keeps_temporary_ids() {
    let mut store = FlakyStore::new();
    let id = seed(&mut store);

    let mut session = EditorSession::new();
    session.load_details(&store, id).expect("load");
    let row_id = session.add_row().expect("row");
    let before = session.current().cloned();

    store.fail_create_node = true;
    session.save(&mut store).expect_err("injected");
    assert_eq!(session.current().cloned(), before);
    assert!(row_id.is_temporary());
    assert!(session.is_dirty());
}

#[test]
fn saved_edits_round_trip_through_storage() {
    let mut store = SqliteStore::open_in_memory().expect("store");
    let id = seed(&mut store);

    let mut session = EditorSession::new();
    let loaded = session.load_details(&store, id).expect("load").clone();
    let first_row = loaded.rows()[0].id();
    let nodes: Vec<LocalId> = loaded.rows()[0].nodes().iter().map(Node::id).collect();

    session
        .update_node(nodes[0], "Prospecção", Some("Busca de clientes".to_string()))
        .expect("update");
    session.delete_node(nodes[2]).expect("delete");
    session.add_node_to_row(first_row).expect("add node");
    let new_row = session.add_row().expect("add row");
    let new_node = session
        .current()
        .and_then(|chain| chain.row(new_row))
        .expect("row")
        .nodes()[0]
        .id();
    session
        .update_node(new_node, "Entrega", None)
        .expect("update new node");

    let report = session.save(&mut store).expect("save");
    assert!(!report.created);
    assert_eq!(report.rows_created, 1);
    assert_eq!(report.nodes_created, 2);
    assert_eq!(report.nodes_updated, 1);
    assert_eq!(report.nodes_deleted, 1);

    let saved: Chain = session.current().expect("chain").clone();
    assert!(saved.rows().iter().all(|row| !row.id().is_temporary()));

    let mut fresh = EditorSession::new();
    let reloaded = fresh.load_details(&store, id).expect("reload");
    assert_eq!(reloaded, &saved);
}

#[test]
fn export_json_parses_back_into_same_tree() {
    let mut store = SqliteStore::open_in_memory().expect("store");
    let id = seed(&mut store);

    let mut session = EditorSession::new();
    let loaded = session.load_details(&store, id).expect("load").clone();
    let text = session.export(ExportFormat::Json).expect("export");
    let parsed: Chain = serde_json::from_str(&text).expect("parse");
    assert_eq!(parsed, loaded);
}

#[test]
fn failed_sqlite_sync_writes_nothing() {
    let mut store = SqliteStore::open_in_memory().expect("store");
    let id = seed(&mut store);

    let mut session = EditorSession::new();
    let loaded = session.load_details(&store, id).expect("load").clone();
    let nodes: Vec<LocalId> = loaded.rows()[0].nodes().iter().map(Node::id).collect();
    session
        .update_node(nodes[0], "Aprovação", None)
        .expect("update");
    session.delete_node(nodes[2]).expect("delete");
    session.add_row().expect("add row");
    let edited = session.current().cloned();

    reject_node_inserts(&store);
    let err = session.save(&mut store).expect_err("node insert rejected");
    assert_eq!(err.code(), ErrorCode::StorageFailure);
    assert_eq!(count(&store, "value_chain_rows"), 1);
    assert_eq!(count(&store, "value_chain_nodes"), 3);
    assert_eq!(stored_texts(&store), vec![""; 3]);
    assert_eq!(session.current().cloned(), edited);
    assert_eq!(session.state(), SessionState::Editing);

    store
        .connection()
        .execute_batch("DROP TRIGGER reject_nodes;")
        .expect("drop trigger");
    let report = session.save(&mut store).expect("retry");
    assert_eq!(report.rows_created, 1);
    assert_eq!(count(&store, "value_chain_rows"), 2);
    assert_eq!(count(&store, "value_chain_nodes"), 3);
}

#[test]
fn failed_sqlite_draft_save_leaves_no_chain_or_document() {
    let mut store = SqliteStore::open_in_memory().expect("store");
    reject_node_inserts(&store);

    let mut session = EditorSession::new();
    let draft = session.new_chain("Vendas", document(), 3).clone();

    session.save(&mut store).expect_err("node insert rejected");
    assert_eq!(count(&store, "value_chains"), 0);
    assert_eq!(count(&store, "documents"), 0);
    assert_eq!(count(&store, "value_chain_rows"), 0);
    assert_eq!(session.current(), Some(&draft));
    assert!(draft.id().is_temporary());
}

#[test]
fn append_after_largest_position_is_rejected() {
    let mut store = SqliteStore::open_in_memory().expect("store");
    let created = store
        .create_chain(&NewChain {
            name: "Vendas".to_string(),
            title: "VENDAS".to_string(),
            document: document(),
        })
        .expect("create chain");
    let chain_id = created.value_chain.id;
    let row = store.create_row(chain_id, 0).expect("row");
    store.create_node(row.id, i64::MAX, None).expect("node");

    let mut session = EditorSession::new();
    let before = session.load_details(&store, chain_id).expect("load").clone();

    let err = session
        .add_node_to_row(LocalId::Persisted(row.id))
        .expect_err("no position left");
    assert!(matches!(err, EditorError::Position(PositionOverflow(i64::MAX))));
    assert_eq!(err.code(), ErrorCode::PositionExhausted);
    assert_eq!(session.current(), Some(&before));
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(
        positions(session.current().expect("chain").rows()[0].nodes()),
        vec![i64::MAX]
    );
}
