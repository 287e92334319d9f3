//! `vchain show`: one chain with its document, rows and nodes.

use super::Context;
use crate::output::{pretty_kv, pretty_rule, pretty_section, render_mode};
use anyhow::Result;
use clap::Args;
use std::io::{self, Write};
use valchain_core::editor::EditorSession;
use valchain_core::model::Chain;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Chain id, as printed by `vchain list`.
    pub chain: i64,
}

/// Execute `vchain show <chain>`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the chain does not
/// exist.
pub fn run_show(args: &ShowArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let mut session = EditorSession::new();
    let chain = session.load_details(&store, args.chain)?;

    render_mode(ctx.output, chain, render_show_text, render_show_human)
}

/// Tab-separated `row` and `node` records in tree order.
pub fn render_show_text(chain: &Chain, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "chain\t{}\t{}\t{}", chain.id(), chain.name, chain.title)?;
    for row in chain.rows() {
        writeln!(w, "row\t{}\t{}", row.id(), row.position())?;
        for node in row.nodes() {
            writeln!(
                w,
                "node\t{}\t{}\t{}\t{}\t{}",
                row.id(),
                node.id(),
                node.position(),
                if node.is_empty() { "empty" } else { "filled" },
                node.text()
            )?;
        }
    }
    Ok(())
}

pub fn render_show_human(chain: &Chain, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("{} (chain {})", chain.title, chain.id()))?;
    pretty_kv(w, "Name", &chain.name)?;
    pretty_kv(w, "Document", &chain.document.code)?;
    pretty_kv(w, "Revision", &chain.document.revision)?;
    pretty_kv(w, "Date", &chain.document.date)?;
    if !chain.document.author.is_empty() {
        pretty_kv(w, "Author", &chain.document.author)?;
    }
    if !chain.document.approver.is_empty() {
        pretty_kv(w, "Approver", &chain.document.approver)?;
    }

    if chain.rows().is_empty() {
        writeln!(w)?;
        return writeln!(w, "(no rows)");
    }

    for row in chain.rows() {
        writeln!(w)?;
        writeln!(w, "Row {} (position {})", row.id(), row.position())?;
        pretty_rule(w)?;
        if row.nodes().is_empty() {
            writeln!(w, "  (no nodes)")?;
        }
        for node in row.nodes() {
            let text = if node.is_empty() {
                "(empty)"
            } else {
                node.text()
            };
            writeln!(w, "  [{}] {text}", node.id())?;
            if let Some(description) = node.description() {
                writeln!(w, "        {description}")?;
            }
        }
    }
    Ok(())
}
