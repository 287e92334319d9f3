//! `vchain node add|update|delete`: node edits, saved immediately.

use super::{Context, EditOutcome, describe_save, edit_chain};
use crate::output::{pretty_kv, render};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use valchain_core::editor::EditorError;
use valchain_core::model::{LocalId, Node};

#[derive(Subcommand, Debug)]
pub enum NodeCommand {
    /// Append an empty node to a row.
    Add(NodeAddArgs),
    /// Replace a node's text and description.
    Update(NodeUpdateArgs),
    /// Delete a node. The row is kept even when it becomes empty.
    Delete(NodeDeleteArgs),
}

#[derive(Args, Debug)]
pub struct NodeAddArgs {
    /// Chain id.
    pub chain: i64,
    /// Row id, as printed by `vchain show`.
    pub row: i64,
}

#[derive(Args, Debug)]
pub struct NodeUpdateArgs {
    /// Chain id.
    pub chain: i64,
    /// Node id, as printed by `vchain show`.
    pub node: i64,

    /// New node text. Blank text marks the node empty.
    #[arg(short, long, allow_hyphen_values = true)]
    pub text: String,

    /// Longer description. Omit to clear it.
    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct NodeDeleteArgs {
    /// Chain id.
    pub chain: i64,
    /// Node id.
    pub node: i64,
}

#[derive(Debug, Serialize)]
struct NodeDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_node_id: Option<LocalId>,
}

/// Execute a `vchain node` subcommand.
///
/// # Errors
///
/// Returns an error if the chain, row or node does not exist or the save
/// fails.
pub fn run_node(command: &NodeCommand, ctx: &Context) -> Result<()> {
    match command {
        NodeCommand::Add(args) => run_add(args, ctx),
        NodeCommand::Update(args) => run_update(args, ctx),
        NodeCommand::Delete(args) => run_delete(args, ctx),
    }
}

fn run_add(args: &NodeAddArgs, ctx: &Context) -> Result<()> {
    let row_id = LocalId::Persisted(args.row);
    let (chain, _, save) = edit_chain(ctx, args.chain, |session| {
        session.add_node_to_row(row_id)
    })?;
    let node = chain
        .row(row_id)
        .and_then(|row| row.nodes().last())
        .cloned()
        .ok_or(EditorError::RowNotFound(row_id))?;

    let outcome = EditOutcome {
        chain_id: args.chain,
        detail: NodeDetail {
            node: Some(node),
            deleted_node_id: None,
        },
        save,
    };
    render(ctx.output, &outcome, |outcome, w| {
        if let Some(node) = &outcome.detail.node {
            writeln!(w, "✓ added node {} to row {}", node.id(), args.row)?;
            pretty_kv(w, "Position", node.position().to_string())?;
        }
        pretty_kv(w, "Saved", describe_save(&outcome.save))
    })
}

fn run_update(args: &NodeUpdateArgs, ctx: &Context) -> Result<()> {
    let node_id = LocalId::Persisted(args.node);
    let (chain, (), save) = edit_chain(ctx, args.chain, |session| {
        session
            .update_node(node_id, args.text.clone(), args.description.clone())
            .map(|_| ())
    })?;
    let node = chain
        .node(node_id)
        .cloned()
        .ok_or(EditorError::NodeNotFound(node_id))?;

    let outcome = EditOutcome {
        chain_id: args.chain,
        detail: NodeDetail {
            node: Some(node),
            deleted_node_id: None,
        },
        save,
    };
    render(ctx.output, &outcome, |outcome, w| {
        if let Some(node) = &outcome.detail.node {
            writeln!(w, "✓ updated node {}", node.id())?;
            pretty_kv(w, "Text", node.text())?;
            pretty_kv(w, "Empty", node.is_empty().to_string())?;
            if let Some(description) = node.description() {
                pretty_kv(w, "Description", description)?;
            }
        }
        pretty_kv(w, "Saved", describe_save(&outcome.save))
    })
}

fn run_delete(args: &NodeDeleteArgs, ctx: &Context) -> Result<()> {
    let node_id = LocalId::Persisted(args.node);
    let (_, (), save) = edit_chain(ctx, args.chain, |session| session.delete_node(node_id))?;

    let outcome = EditOutcome {
        chain_id: args.chain,
        detail: NodeDetail {
            node: None,
            deleted_node_id: Some(node_id),
        },
        save,
    };
    render(ctx.output, &outcome, |outcome, w| {
        writeln!(w, "✓ deleted node {node_id} from chain {}", outcome.chain_id)?;
        pretty_kv(w, "Saved", describe_save(&outcome.save))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(subcommand)]
        command: NodeCommand,
    }

    #[test]
    fn update_requires_text() {
        assert!(Wrapper::try_parse_from(["test", "update", "1", "2"]).is_err());

        let w = Wrapper::parse_from(["test", "update", "1", "2", "--text", "Aprovação"]);
        let NodeCommand::Update(args) = w.command else {
            panic!("expected update");
        };
        assert_eq!(args.chain, 1);
        assert_eq!(args.node, 2);
        assert_eq!(args.text, "Aprovação");
        assert!(args.description.is_none());
    }

    #[test]
    fn update_accepts_blank_text_and_description() {
        let w = Wrapper::parse_from(["test", "update", "1", "2", "-t", "", "-d", "Longer text"]);
        let NodeCommand::Update(args) = w.command else {
            panic!("expected update");
        };
        assert_eq!(args.text, "");
        assert_eq!(args.description.as_deref(), Some("Longer text"));
    }

    #[test]
    fn add_and_delete_parse_ids() {
        let w = Wrapper::parse_from(["test", "add", "4", "9"]);
        assert!(matches!(w.command, NodeCommand::Add(NodeAddArgs { chain: 4, row: 9 })));

        let w = Wrapper::parse_from(["test", "delete", "4", "90"]);
        assert!(matches!(
            w.command,
            NodeCommand::Delete(NodeDeleteArgs { chain: 4, node: 90 })
        ));
    }
}
