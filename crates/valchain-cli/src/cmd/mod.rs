//! Command handlers. Each `run_*` takes its clap args and a [`Context`].

pub mod create;
pub mod delete;
pub mod export;
pub mod init;
pub mod list;
pub mod node;
pub mod row;
pub mod show;

use crate::output::{CliError, OutputMode};
use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use valchain_core::config::ProjectConfig;
use valchain_core::db::SqliteStore;
use valchain_core::editor::{EditorError, EditorSession, SaveReport};
use valchain_core::error::ErrorCode;
use valchain_core::model::Chain;

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub project_root: PathBuf,
    pub database: PathBuf,
    pub project: ProjectConfig,
    pub output: OutputMode,
}

impl Context {
    /// Open the configured database, which must already exist.
    ///
    /// # Errors
    ///
    /// [`ErrorCode::NotInitialized`] when the database file is missing, or the
    /// open/migrate failure.
    pub fn open_store(&self) -> Result<SqliteStore> {
        if !self.database.exists() {
            return Err(CliError::coded(
                ErrorCode::NotInitialized,
                format!("no database at {}", self.database.display()),
            )
            .into());
        }
        SqliteStore::open(&self.database)
    }
}

/// Result of an edit-and-save command.
#[derive(Debug, Serialize)]
pub struct EditOutcome<T: Serialize> {
    pub chain_id: i64,
    #[serde(flatten)]
    pub detail: T,
    pub save: SaveReport,
}

/// Load `chain_id`, apply `edit`, save, and hand back the saved tree.
///
/// # Errors
///
/// Any load, edit, or save failure. Nothing is written unless the edit
/// succeeds.
pub fn edit_chain<T>(
    ctx: &Context,
    chain_id: i64,
    edit: impl FnOnce(&mut EditorSession) -> Result<T, EditorError>,
) -> Result<(Chain, T, SaveReport)> {
    let mut store = ctx.open_store()?;
    let mut session = EditorSession::new();
    session.load_details(&store, chain_id)?;
    let value = edit(&mut session)?;
    let report = session.save(&mut store)?;
    let chain = session.current().cloned().ok_or(EditorError::NoChain)?;
    Ok((chain, value, report))
}

/// One-line summary of a save for human output.
pub fn describe_save(report: &SaveReport) -> String {
    if report.is_noop() {
        return "nothing to save".to_string();
    }
    format!(
        "+{} rows, +{} nodes, ~{} nodes, -{} rows, -{} nodes",
        report.rows_created,
        report.nodes_created,
        report.nodes_updated,
        report.rows_deleted,
        report.nodes_deleted
    )
}
