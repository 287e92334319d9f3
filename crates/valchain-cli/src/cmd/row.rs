//! `vchain row add|delete`: structural row edits, saved immediately.

use super::{Context, EditOutcome, describe_save, edit_chain};
use crate::output::{pretty_kv, render};
use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Write;
use valchain_core::editor::EditorError;
use valchain_core::model::LocalId;

#[derive(Subcommand, Debug)]
pub enum RowCommand {
    /// Append a row holding one empty node.
    Add(RowAddArgs),
    /// Delete a row and all of its nodes.
    Delete(RowDeleteArgs),
}

#[derive(Args, Debug)]
pub struct RowAddArgs {
    /// Chain id.
    pub chain: i64,
}

#[derive(Args, Debug)]
pub struct RowDeleteArgs {
    /// Chain id.
    pub chain: i64,
    /// Row id, as printed by `vchain show`.
    pub row: i64,
}

#[derive(Debug, Serialize)]
struct RowDetail {
    row_id: LocalId,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_id: Option<LocalId>,
}

/// Execute a `vchain row` subcommand.
///
/// # Errors
///
/// Returns an error if the chain or row does not exist or the save fails.
pub fn run_row(command: &RowCommand, ctx: &Context) -> Result<()> {
    match command {
        RowCommand::Add(args) => run_add(args, ctx),
        RowCommand::Delete(args) => run_delete(args, ctx),
    }
}

fn run_add(args: &RowAddArgs, ctx: &Context) -> Result<()> {
    let (chain, (), save) = edit_chain(ctx, args.chain, |session| {
        session.add_row().map(|_| ())
    })?;
    let row = chain.rows().last().ok_or(EditorError::NoChain)?;
    let outcome = EditOutcome {
        chain_id: args.chain,
        detail: RowDetail {
            row_id: row.id(),
            node_id: row.nodes().first().map(|node| node.id()),
        },
        save,
    };

    render(ctx.output, &outcome, |outcome, w| {
        writeln!(w, "✓ added row {} to chain {}", outcome.detail.row_id, outcome.chain_id)?;
        if let Some(node_id) = outcome.detail.node_id {
            pretty_kv(w, "Node", node_id.to_string())?;
        }
        pretty_kv(w, "Saved", describe_save(&outcome.save))
    })
}

fn run_delete(args: &RowDeleteArgs, ctx: &Context) -> Result<()> {
    let row_id = LocalId::Persisted(args.row);
    let (_, (), save) = edit_chain(ctx, args.chain, |session| session.delete_row(row_id))?;
    let outcome = EditOutcome {
        chain_id: args.chain,
        detail: RowDetail {
            row_id,
            node_id: None,
        },
        save,
    };

    render(ctx.output, &outcome, |outcome, w| {
        writeln!(
            w,
            "✓ deleted row {} from chain {}",
            outcome.detail.row_id, outcome.chain_id
        )?;
        pretty_kv(w, "Saved", describe_save(&outcome.save))
    })
}
