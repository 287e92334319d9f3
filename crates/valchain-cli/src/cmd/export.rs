//! `vchain export`: JSON or YAML snapshot of a stored chain.

use super::Context;
use crate::output::{pretty_kv, render};
use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use valchain_core::editor::export::{default_file_name, write_snapshot};
use valchain_core::editor::{EditorError, EditorSession, ExportFormat};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Chain id.
    pub chain: i64,

    /// Snapshot format: json or yaml (defaults to `[export] format`).
    #[arg(short, long)]
    pub format: Option<ExportFormat>,

    /// Output file, or `-` for stdout. Defaults to `<chain name>.<format>`
    /// in the project root.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Exported {
    chain_id: i64,
    format: ExportFormat,
    path: String,
}

/// Execute `vchain export <chain>`.
///
/// # Errors
///
/// Returns an error if the chain cannot be loaded or the snapshot cannot be
/// written.
pub fn run_export(args: &ExportArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let format = args.format.unwrap_or(ctx.project.export.format);

    let mut session = EditorSession::new();
    session.load_details(&store, args.chain)?;

    if args.output.as_deref().is_some_and(|path| path.as_os_str() == "-") {
        let text = session.export(format)?;
        std::io::stdout().lock().write_all(text.as_bytes())?;
        return Ok(());
    }

    let chain = session.current().ok_or(EditorError::NoChain)?;
    let path = args.output.clone().unwrap_or_else(|| {
        ctx.project_root.join(default_file_name(chain, format))
    });
    write_snapshot(chain, format, &path).map_err(EditorError::from)?;

    let exported = Exported {
        chain_id: args.chain,
        format,
        path: path.display().to_string(),
    };
    render(ctx.output, &exported, |exported, w| {
        writeln!(w, "✓ exported chain {}", exported.chain_id)?;
        pretty_kv(w, "Format", exported.format.to_string())?;
        pretty_kv(w, "File", &exported.path)
    })
}
