//! The editable value-chain tree: ordered rows of ordered nodes.
//!
//! Order is carried by an explicit `position` on every row and node. Appended
//! elements take `last sibling position + 1`, so positions stay strictly
//! ascending without renumbering after deletions.

use super::document::DocumentInfo;
use super::id::LocalId;
use serde::{Deserialize, Serialize};

/// Error returned when a row or node cannot be appended because its last
/// sibling already sits at the largest representable position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no position left after {0}")]
pub struct PositionOverflow(pub i64);

/// `true` when `text` has no visible content.
#[must_use]
pub fn text_is_empty(text: &str) -> bool {
    text.trim().is_empty()
}

/// A single labeled box within a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    id: LocalId,
    position: i64,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    is_empty: bool,
}

impl Node {
    /// A fresh empty node with a temporary id.
    #[must_use]
    pub fn empty(position: i64) -> Self {
        Self {
            id: LocalId::temporary(),
            position,
            text: String::new(),
            description: None,
            is_empty: true,
        }
    }

    /// Rebuild a node from stored values, keeping the stored `is_empty` flag.
    #[must_use]
    pub const fn hydrated(
        id: LocalId,
        position: i64,
        text: String,
        description: Option<String>,
        is_empty: bool,
    ) -> Self {
        Self {
            id,
            position,
            text,
            description,
            is_empty,
        }
    }

    #[must_use]
    pub const fn id(&self) -> LocalId {
        self.id
    }

    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Replace text and description, recomputing `is_empty`.
    pub fn set_content(&mut self, text: impl Into<String>, description: Option<String>) {
        self.text = text.into();
        self.description = description;
        self.is_empty = text_is_empty(&self.text);
    }

    pub(crate) const fn set_id(&mut self, id: LocalId) {
        self.id = id;
    }
}

/// An ordered horizontal grouping of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    id: LocalId,
    position: i64,
    nodes: Vec<Node>,
}

impl Row {
    /// A fresh row with a temporary id and `node_count` empty nodes.
    #[must_use]
    pub fn with_empty_nodes(position: i64, node_count: usize) -> Self {
        let nodes = (0..node_count)
            .map(|index| Node::empty(i64::try_from(index).unwrap_or(i64::MAX)))
            .collect();
        Self {
            id: LocalId::temporary(),
            position,
            nodes,
        }
    }

    #[must_use]
    pub const fn hydrated(id: LocalId, position: i64, nodes: Vec<Node>) -> Self {
        Self {
            id,
            position,
            nodes,
        }
    }

    #[must_use]
    pub const fn id(&self) -> LocalId {
        self.id
    }

    #[must_use]
    pub const fn position(&self) -> i64 {
        self.position
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Append an empty node and return its id.
    ///
    /// # Errors
    ///
    /// [`PositionOverflow`] when the last node is at `i64::MAX`; the row is
    /// left unchanged.
    pub fn push_empty_node(&mut self) -> Result<LocalId, PositionOverflow> {
        let node = Node::empty(next_position(self.nodes.iter().map(Node::position))?);
        let id = node.id();
        self.nodes.push(node);
        Ok(id)
    }

    fn node_mut(&mut self, id: LocalId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub(crate) const fn set_id(&mut self, id: LocalId) {
        self.id = id;
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }
}

/// A value-chain diagram with its document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    id: LocalId,
    pub name: String,
    pub title: String,
    pub document: DocumentInfo,
    rows: Vec<Row>,
}

impl Chain {
    /// A draft chain: temporary id, title is the uppercased name, and a
    /// single row of `node_count` empty nodes.
    #[must_use]
    pub fn draft(name: impl Into<String>, document: DocumentInfo, node_count: usize) -> Self {
        let name = name.into();
        Self {
            id: LocalId::temporary(),
            title: name.to_uppercase(),
            name,
            document,
            rows: vec![Row::with_empty_nodes(0, node_count)],
        }
    }

    #[must_use]
    pub const fn hydrated(
        id: LocalId,
        name: String,
        title: String,
        document: DocumentInfo,
        rows: Vec<Row>,
    ) -> Self {
        Self {
            id,
            name,
            title,
            document,
            rows,
        }
    }

    #[must_use]
    pub const fn id(&self) -> LocalId {
        self.id
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, id: LocalId) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Find a node anywhere in the tree; rows are searched in order.
    #[must_use]
    pub fn node(&self, id: LocalId) -> Option<&Node> {
        self.rows
            .iter()
            .find_map(|row| row.nodes.iter().find(|node| node.id == id))
    }

    /// Append a row holding one empty node. Returns the new row's id.
    ///
    /// # Errors
    ///
    /// [`PositionOverflow`] when the last row is at `i64::MAX`.
    pub fn add_row(&mut self) -> Result<LocalId, PositionOverflow> {
        let position = next_position(self.rows.iter().map(Row::position))?;
        let row = Row::with_empty_nodes(position, 1);
        let id = row.id();
        self.rows.push(row);
        Ok(id)
    }

    /// Append an empty node to `row_id`. `Ok(None)` when the row does not
    /// exist.
    ///
    /// # Errors
    ///
    /// [`PositionOverflow`] when the row's last node is at `i64::MAX`.
    pub fn add_node_to_row(&mut self, row_id: LocalId) -> Result<Option<LocalId>, PositionOverflow> {
        self.rows
            .iter_mut()
            .find(|row| row.id == row_id)
            .map(Row::push_empty_node)
            .transpose()
    }

    /// Replace a node's content. `false` when the node does not exist.
    pub fn update_node(
        &mut self,
        node_id: LocalId,
        text: impl Into<String>,
        description: Option<String>,
    ) -> bool {
        match self.rows.iter_mut().find_map(|row| row.node_mut(node_id)) {
            Some(node) => {
                node.set_content(text, description);
                true
            }
            None => false,
        }
    }

    /// Remove a node from its row. Empty rows are kept.
    pub fn delete_node(&mut self, node_id: LocalId) -> bool {
        for row in &mut self.rows {
            let before = row.nodes.len();
            row.nodes.retain(|node| node.id != node_id);
            if row.nodes.len() != before {
                return true;
            }
        }
        false
    }

    pub fn delete_row(&mut self, row_id: LocalId) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != row_id);
        self.rows.len() != before
    }

    pub(crate) const fn set_id(&mut self, id: LocalId) {
        self.id = id;
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }
}

fn next_position(positions: impl Iterator<Item = i64>) -> Result<i64, PositionOverflow> {
    positions
        .max()
        .map_or(Ok(0), |last| last.checked_add(1).ok_or(PositionOverflow(last)))
}
