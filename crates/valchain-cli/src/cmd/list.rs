//! `vchain list`: stored chains, newest first.

use super::Context;
use crate::output::{pretty_rule, render_mode};
use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use std::io::{self, Write};
use valchain_core::editor::{ChainSummary, EditorSession};

/// Execute `vchain list`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_list(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let mut session = EditorSession::new();
    let summaries = session.load_list(&store)?.to_vec();

    render_mode(
        ctx.output,
        &summaries,
        |summaries, w| render_list_text(summaries, w),
        |summaries, w| render_list_human(summaries, w),
    )
}

#[must_use]
pub fn micros_to_local_datetime(us: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(us).map_or_else(
        || us.to_string(),
        |ts| {
            ts.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

fn render_list_text(summaries: &[ChainSummary], w: &mut dyn Write) -> io::Result<()> {
    for chain in summaries {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}",
            chain.id, chain.name, chain.document.code, chain.document.revision, chain.document.date
        )?;
    }
    Ok(())
}

fn render_list_human(summaries: &[ChainSummary], w: &mut dyn Write) -> io::Result<()> {
    if summaries.is_empty() {
        return writeln!(w, "No value chains yet. Create one with `vchain create --name <NAME>`.");
    }
    writeln!(
        w,
        "{:>5}  {:<24} {:<12} {:<4} {:<10}  CREATED",
        "ID", "TITLE", "CODE", "REV", "DATE"
    )?;
    pretty_rule(w)?;
    for chain in summaries {
        writeln!(
            w,
            "{:>5}  {:<24} {:<12} {:<4} {:<10}  {}",
            chain.id,
            chain.title,
            chain.document.code,
            chain.document.revision,
            chain.document.date,
            micros_to_local_datetime(chain.created_at_us)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use valchain_core::model::DocumentInfo;

    fn summary(id: i64, name: &str) -> ChainSummary {
        ChainSummary {
            id,
            name: name.to_string(),
            title: name.to_uppercase(),
            document: DocumentInfo {
                code: "CV-PA-01".to_string(),
                revision: "01".to_string(),
                date: "2024-03-01".to_string(),
                author: String::new(),
                approver: String::new(),
            },
            created_at_us: 0,
        }
    }

    #[test]
    fn text_rows_are_tab_separated() {
        let mut buf = Vec::new();
        render_list_text(&[summary(2, "Compras"), summary(1, "Vendas")], &mut buf)
            .expect("render");
        let s = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines, vec![
            "2\tCompras\tCV-PA-01\t01\t2024-03-01",
            "1\tVendas\tCV-PA-01\t01\t2024-03-01",
        ]);
    }

    #[test]
    fn empty_human_list_hints_at_create() {
        let mut buf = Vec::new();
        render_list_human(&[], &mut buf).expect("render");
        let s = String::from_utf8(buf).expect("utf8");
        assert!(s.contains("vchain create"));
    }

    #[test]
    fn invalid_timestamp_falls_back_to_raw_value() {
        assert_eq!(micros_to_local_datetime(i64::MAX), i64::MAX.to_string());
    }
}
