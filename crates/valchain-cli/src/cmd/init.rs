//! `vchain init`: create the project config and an empty, migrated database.

use super::Context;
use crate::output::{pretty_kv, render};
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use valchain_core::config::{project_config_path, write_default_project_config};
use valchain_core::db::SqliteStore;
use valchain_core::db::migrations;

#[derive(Debug, Serialize)]
struct InitReport {
    config: String,
    config_created: bool,
    database: String,
    schema_version: u32,
}

/// Execute `vchain init`. Re-running is safe: an existing config is kept and
/// the database is only migrated forward.
///
/// # Errors
///
/// Returns an error if the config cannot be written or the database cannot
/// be opened and migrated.
pub fn run_init(ctx: &Context) -> Result<()> {
    let config_created = write_default_project_config(&ctx.project_root)?;
    let store = SqliteStore::open(&ctx.database)?;
    let schema_version = migrations::current_schema_version(store.connection())?;

    tracing::info!(database = %ctx.database.display(), schema_version, "project initialized");

    let report = InitReport {
        config: project_config_path(&ctx.project_root).display().to_string(),
        config_created,
        database: ctx.database.display().to_string(),
        schema_version,
    };

    render(ctx.output, &report, |report, w| {
        if report.config_created {
            writeln!(w, "✓ initialized valchain project")?;
        } else {
            writeln!(w, "✓ valchain project already initialized")?;
        }
        pretty_kv(w, "Config", &report.config)?;
        pretty_kv(w, "Database", &report.database)?;
        pretty_kv(w, "Schema", report.schema_version.to_string())
    })
}
