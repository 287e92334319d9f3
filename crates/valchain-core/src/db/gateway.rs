//! Persistence gateway contract.
//!
//! [`ChainStore`] is the only storage surface the editor session relies on.
//! Records mirror the normalized tables; the editor never sees SQL.

use crate::error::StoreError;
use crate::model::{DocumentInfo, LocalId};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A stored `documents` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: i64,
    #[serde(flatten)]
    pub info: DocumentInfo,
    pub created_at_us: i64,
}

/// A stored `value_chains` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainRecord {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub document_id: i64,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// A chain joined with its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredChain {
    pub value_chain: ChainRecord,
    pub document: Document,
}

/// A stored `value_chain_rows` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRecord {
    pub id: i64,
    pub value_chain_id: i64,
    pub position: i64,
    pub created_at_us: i64,
}

/// A stored `value_chain_nodes` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRecord {
    pub id: i64,
    pub row_id: i64,
    pub position: i64,
    pub text: String,
    pub description: Option<String>,
    pub is_empty: bool,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// A row with its nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWithNodes {
    #[serde(flatten)]
    pub row: RowRecord,
    pub nodes: Vec<NodeRecord>,
}

/// A chain with its document and full row/node tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainDetails {
    pub value_chain: ChainRecord,
    pub document: Document,
    pub rows: Vec<RowWithNodes>,
}

/// Input to [`ChainStore::create_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChain {
    pub name: String,
    pub title: String,
    pub document: DocumentInfo,
}

impl NewChain {
    /// Reject structurally malformed input before any write happens.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::validation("chain name must not be blank"));
        }
        if self.title.trim().is_empty() {
            return Err(StoreError::validation("chain title must not be blank"));
        }
        if self.document.code.trim().is_empty() {
            return Err(StoreError::validation("document code must not be blank"));
        }
        if self.document.revision.trim().is_empty() {
            return Err(StoreError::validation("document revision must not be blank"));
        }
        if self.document.parsed_date().is_none() {
            return Err(StoreError::validation(format!(
                "document date '{}' is not a YYYY-MM-DD date",
                self.document.date
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sync plans
// ---------------------------------------------------------------------------

/// A node that does not exist in storage yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub local: LocalId,
    pub position: i64,
    pub text: String,
    pub description: Option<String>,
}

/// A row that does not exist in storage yet, with all of its nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRow {
    pub local: LocalId,
    pub position: i64,
    pub nodes: Vec<NewNode>,
}

/// A new node inside a row that is already stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNode {
    pub row_id: i64,
    pub node: NewNode,
}

/// Replacement content for a stored node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpdate {
    pub id: i64,
    pub text: String,
    pub description: Option<String>,
}

/// The writes that bring one stored chain in line with an edited tree.
///
/// Applied in field order: node deletes, row deletes, updates, new rows,
/// new nodes in existing rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub delete_nodes: Vec<i64>,
    pub delete_rows: Vec<i64>,
    pub update_nodes: Vec<NodeUpdate>,
    pub create_rows: Vec<NewRow>,
    pub create_nodes: Vec<PendingNode>,
}

impl SyncPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delete_nodes.is_empty()
            && self.delete_rows.is_empty()
            && self.update_nodes.is_empty()
            && self.create_rows.is_empty()
            && self.create_nodes.is_empty()
    }

    /// Number of nodes the plan creates, across new and existing rows.
    #[must_use]
    pub fn created_node_count(&self) -> usize {
        self.create_rows.iter().map(|row| row.nodes.len()).sum::<usize>() + self.create_nodes.len()
    }
}

/// Storage ids issued while applying a [`SyncPlan`], keyed by the local ids
/// they replace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuedIds {
    pub rows: Vec<(LocalId, i64)>,
    pub nodes: Vec<(LocalId, i64)>,
}

impl IssuedIds {
    #[must_use]
    pub fn row(&self, local: LocalId) -> Option<i64> {
        lookup(&self.rows, local)
    }

    #[must_use]
    pub fn node(&self, local: LocalId) -> Option<i64> {
        lookup(&self.nodes, local)
    }
}

fn lookup(pairs: &[(LocalId, i64)], local: LocalId) -> Option<i64> {
    pairs
        .iter()
        .find_map(|(candidate, id)| (*candidate == local).then_some(*id))
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Durable storage of the chain hierarchy.
///
/// Every write commits immediately. Implementations surface every failure;
/// nothing is retried.
pub trait ChainStore {
    /// Create a document and the chain that references it.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] for malformed input; [`StoreError::Storage`]
    /// on backend failure. Neither record persists on failure.
    fn create_chain(&mut self, new: &NewChain) -> Result<StoredChain, StoreError>;

    /// All chains with their documents, newest first.
    ///
    /// # Errors
    ///
    /// [`StoreError::Storage`] on backend failure.
    fn list_chains(&self) -> Result<Vec<StoredChain>, StoreError>;

    /// One chain with its rows ordered by position.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no chain has this id.
    fn get_chain_details(&self, id: i64) -> Result<ChainDetails, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the chain does not exist.
    fn create_row(&mut self, chain_id: i64, position: i64) -> Result<RowRecord, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the row does not exist.
    fn create_node(
        &mut self,
        row_id: i64,
        position: i64,
        text: Option<&str>,
    ) -> Result<NodeRecord, StoreError>;

    /// Replace a node's text and description, recomputing `is_empty`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the node does not exist.
    fn update_node(
        &mut self,
        id: i64,
        text: &str,
        description: Option<&str>,
    ) -> Result<NodeRecord, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the node does not exist.
    fn delete_node(&mut self, id: i64) -> Result<(), StoreError>;

    /// Delete a row and its nodes.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the row does not exist.
    fn delete_row(&mut self, id: i64) -> Result<(), StoreError>;

    /// Delete a chain with its rows, nodes and document.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the chain does not exist.
    fn delete_chain(&mut self, id: i64) -> Result<(), StoreError>;

    /// Apply a [`SyncPlan`] to one chain.
    ///
    /// The default issues the singleton primitives one by one and stops at
    /// the first failure; stores with transactions should override it.
    ///
    /// # Errors
    ///
    /// The first error raised by an underlying primitive.
    fn apply_sync(&mut self, chain_id: i64, plan: &SyncPlan) -> Result<IssuedIds, StoreError> {
        apply_with_primitives(self, chain_id, plan)
    }
}

/// Apply `plan` through the singleton [`ChainStore`] primitives.
///
/// # Errors
///
/// The first error raised by an underlying primitive.
pub fn apply_with_primitives<S: ChainStore + ?Sized>(
    store: &mut S,
    chain_id: i64,
    plan: &SyncPlan,
) -> Result<IssuedIds, StoreError> {
    let mut issued = IssuedIds::default();

    for id in &plan.delete_nodes {
        store.delete_node(*id)?;
    }
    for id in &plan.delete_rows {
        store.delete_row(*id)?;
    }
    for update in &plan.update_nodes {
        store.update_node(update.id, &update.text, update.description.as_deref())?;
    }
    for new_row in &plan.create_rows {
        let row = store.create_row(chain_id, new_row.position)?;
        issued.rows.push((new_row.local, row.id));
        for node in &new_row.nodes {
            let id = create_node_with_content(store, row.id, node)?;
            issued.nodes.push((node.local, id));
        }
    }
    for pending in &plan.create_nodes {
        let id = create_node_with_content(store, pending.row_id, &pending.node)?;
        issued.nodes.push((pending.node.local, id));
    }

    Ok(issued)
}

fn create_node_with_content<S: ChainStore + ?Sized>(
    store: &mut S,
    row_id: i64,
    node: &NewNode,
) -> Result<i64, StoreError> {
    let record = store.create_node(row_id, node.position, Some(&node.text))?;
    if node.description.is_some() {
        store.update_node(record.id, &node.text, node.description.as_deref())?;
    }
    Ok(record.id)
}
