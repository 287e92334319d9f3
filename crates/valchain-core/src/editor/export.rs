//! Structured-text snapshots of the in-memory chain.
//!
//! A snapshot is a lossless dump of the tree (ids, positions, `is_empty`
//! included). Storage never imports it back.

use crate::model::Chain;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Output format for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Yaml,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Errors raised while producing or writing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("unknown export format '{0}': expected json or yaml")]
    UnknownFormat(String),

    #[error("failed to serialize chain as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to serialize chain as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to write snapshot: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize `chain` in the requested format.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(chain: &Chain, format: ExportFormat) -> Result<String, ExportError> {
    let mut text = match format {
        ExportFormat::Json => serde_json::to_string_pretty(chain)?,
        ExportFormat::Yaml => serde_yaml::to_string(chain)?,
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    Ok(text)
}

/// Default download name: `<chain name>.<ext>`, with path separators and
/// other unsafe characters replaced.
#[must_use]
pub fn default_file_name(chain: &Chain, format: ExportFormat) -> String {
    let stem: String = chain
        .name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.trim_matches('.').is_empty() {
        "chain".to_string()
    } else {
        stem
    };
    format!("{stem}.{}", format.extension())
}

/// Render `chain` and write it to `path`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_snapshot(chain: &Chain, format: ExportFormat, path: &Path) -> Result<(), ExportError> {
    let text = render(chain, format)?;
    std::fs::write(path, text)?;
    tracing::info!(path = %path.display(), %format, "exported chain snapshot");
    Ok(())
}
