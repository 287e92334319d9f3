//! `vchain create`: start a draft chain and save it.

use super::{Context, describe_save};
use crate::output::{pretty_kv, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use valchain_core::editor::{EditorError, EditorSession, SaveReport};
use valchain_core::model::{Chain, DocumentInfo};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Chain name. The title is the name in upper case.
    #[arg(short, long)]
    pub name: String,

    /// Number of empty nodes in the first row (defaults to config, then 3).
    #[arg(long, value_name = "COUNT")]
    pub nodes: Option<usize>,

    /// Document code (defaults to config, then CV-PA-01).
    #[arg(long)]
    pub code: Option<String>,

    /// Document revision (defaults to config, then 01).
    #[arg(long)]
    pub revision: Option<String>,

    /// Document date as YYYY-MM-DD (defaults to today).
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub approver: Option<String>,
}

impl CreateArgs {
    /// Document info from flags, falling back to project defaults.
    fn document(&self, ctx: &Context) -> DocumentInfo {
        let mut document = ctx.project.defaults.document();
        let overrides = [
            (&mut document.code, &self.code),
            (&mut document.revision, &self.revision),
            (&mut document.date, &self.date),
            (&mut document.author, &self.author),
            (&mut document.approver, &self.approver),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                field.clone_from(value);
            }
        }
        document
    }
}

#[derive(Debug, Serialize)]
struct Created {
    chain: Chain,
    save: SaveReport,
}

/// Execute `vchain create`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the chain fails
/// validation.
pub fn run_create(args: &CreateArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let node_count = args.nodes.unwrap_or(ctx.project.defaults.node_count);

    let mut session = EditorSession::new();
    session.new_chain(args.name.trim(), args.document(ctx), node_count);
    let save = session.save(&mut store)?;
    let chain = session.current().cloned().ok_or(EditorError::NoChain)?;

    render(ctx.output, &Created { chain, save }, |created, w| {
        writeln!(
            w,
            "✓ created chain {} ({})",
            created.save.chain_id, created.chain.title
        )?;
        pretty_kv(w, "Document", &created.chain.document.code)?;
        pretty_kv(w, "Revision", &created.chain.document.revision)?;
        pretty_kv(w, "Date", &created.chain.document.date)?;
        pretty_kv(w, "Saved", describe_save(&created.save))
    })
}
