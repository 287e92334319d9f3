//! Diff an edited tree against storage and fold issued ids back in.

use crate::db::gateway::{
    ChainDetails, IssuedIds, NewNode, NewRow, NodeUpdate, PendingNode, RowWithNodes, SyncPlan,
};
use crate::error::{Entity, StoreError};
use crate::model::{Chain, LocalId, Node, Row};
use std::collections::{HashMap, HashSet};

fn new_node(node: &Node) -> NewNode {
    NewNode {
        local: node.id(),
        position: node.position(),
        text: node.text().to_string(),
        description: node.description().map(str::to_string),
    }
}

fn new_row(row: &Row) -> NewRow {
    NewRow {
        local: row.id(),
        position: row.position(),
        nodes: row.nodes().iter().map(new_node).collect(),
    }
}

/// Everything in a chain that has never been stored.
#[must_use]
pub fn plan_for_draft(chain: &Chain) -> SyncPlan {
    SyncPlan {
        create_rows: chain.rows().iter().map(new_row).collect(),
        ..SyncPlan::default()
    }
}

/// Writes that make `stored` match `chain`.
///
/// Rows and nodes only ever get appended in memory, so positions of stored
/// elements never need rewriting.
///
/// # Errors
///
/// [`StoreError::NotFound`] when the tree references a persisted row or node
/// that storage no longer has.
pub fn diff(stored: &ChainDetails, chain: &Chain) -> Result<SyncPlan, StoreError> {
    let stored_rows: HashMap<i64, &RowWithNodes> =
        stored.rows.iter().map(|row| (row.row.id, row)).collect();
    let kept_rows: HashSet<i64> = chain
        .rows()
        .iter()
        .filter_map(|row| row.id().persisted())
        .collect();

    let mut plan = SyncPlan {
        delete_rows: stored
            .rows
            .iter()
            .map(|row| row.row.id)
            .filter(|id| !kept_rows.contains(id))
            .collect(),
        ..SyncPlan::default()
    };

    for row in chain.rows() {
        let row_id = match row.id() {
            LocalId::Temporary(_) => {
                plan.create_rows.push(new_row(row));
                continue;
            }
            LocalId::Persisted(id) => id,
        };
        let stored_row = stored_rows
            .get(&row_id)
            .ok_or_else(|| StoreError::not_found(Entity::Row, row_id))?;
        diff_row(&mut plan, row_id, stored_row, row)?;
    }

    Ok(plan)
}

fn diff_row(
    plan: &mut SyncPlan,
    row_id: i64,
    stored: &RowWithNodes,
    row: &Row,
) -> Result<(), StoreError> {
    let kept: HashSet<i64> = row
        .nodes()
        .iter()
        .filter_map(|node| node.id().persisted())
        .collect();
    plan.delete_nodes.extend(
        stored
            .nodes
            .iter()
            .map(|node| node.id)
            .filter(|id| !kept.contains(id)),
    );

    for node in row.nodes() {
        let node_id = match node.id() {
            LocalId::Temporary(_) => {
                plan.create_nodes.push(PendingNode {
                    row_id,
                    node: new_node(node),
                });
                continue;
            }
            LocalId::Persisted(id) => id,
        };
        let stored_node = stored
            .nodes
            .iter()
            .find(|candidate| candidate.id == node_id)
            .ok_or_else(|| StoreError::not_found(Entity::Node, node_id))?;

        let changed = stored_node.text != node.text()
            || stored_node.description.as_deref() != node.description()
            || stored_node.is_empty != node.is_empty();
        if changed {
            plan.update_nodes.push(NodeUpdate {
                id: node_id,
                text: node.text().to_string(),
                description: node.description().map(str::to_string),
            });
        }
    }

    Ok(())
}

/// Replace temporary ids in `chain` with the ids storage issued for them.
pub fn reconcile(chain: &mut Chain, issued: &IssuedIds) {
    for row in chain.rows_mut() {
        if let Some(id) = issued.row(row.id()) {
            row.set_id(LocalId::Persisted(id));
        }
        for node in row.nodes_mut() {
            if let Some(id) = issued.node(node.id()) {
                node.set_id(LocalId::Persisted(id));
            }
        }
    }
}
