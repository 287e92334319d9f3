use crate::editor::ExportFormat;
use crate::model::DocumentInfo;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Directory holding project state, relative to the project root.
pub const PROJECT_DIR: &str = ".valchain";
/// Environment variable overriding the database path.
pub const DB_ENV: &str = "VALCHAIN_DB";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file, relative to the project root unless absolute.
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

/// Values used to fill a new chain's document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_document_code")]
    pub document_code: String,
    #[serde(default = "default_revision")]
    pub revision: String,
    #[serde(default = "default_node_count")]
    pub node_count: usize,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub approver: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            document_code: default_document_code(),
            revision: default_revision(),
            node_count: default_node_count(),
            author: String::new(),
            approver: String::new(),
        }
    }
}

impl DefaultsConfig {
    /// Document info for a chain created today.
    #[must_use]
    pub fn document(&self) -> DocumentInfo {
        DocumentInfo {
            author: self.author.clone(),
            approver: self.approver.clone(),
            ..DocumentInfo::dated_today(self.document_code.clone(), self.revision.clone())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub format: ExportFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub database: PathBuf,
    pub resolved_output: String,
}

/// Path of the project config file under `project_root`.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join("config.toml")
}

/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write a default project config unless one already exists.
///
/// Returns `true` when a file was written.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_default_project_config(project_root: &Path) -> Result<bool> {
    let path = project_config_path(project_root);
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content =
        toml::to_string_pretty(&ProjectConfig::default()).context("Failed to render config")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// # Errors
///
/// Returns an error if the user config exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("valchain/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Merge project config, user config, environment and CLI flags.
///
/// # Errors
///
/// Returns an error if either config file is malformed.
pub fn resolve_config(
    project_root: &Path,
    cli_json: bool,
    cli_db: Option<&Path>,
) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let database = resolve_database_path(
        project_root,
        &project.storage,
        cli_db,
        env::var(DB_ENV).ok(),
    );
    let resolved_output = resolve_output(cli_json, user.output.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        database,
        resolved_output,
    })
}

/// `--db` wins over `VALCHAIN_DB`, which wins over `[storage] database`.
/// Relative paths are taken from the project root.
#[must_use]
pub fn resolve_database_path(
    project_root: &Path,
    storage: &StorageConfig,
    cli_db: Option<&Path>,
    env_db: Option<String>,
) -> PathBuf {
    let chosen = cli_db.map_or_else(
        || {
            env_db
                .filter(|value| !value.trim().is_empty())
                .map_or_else(|| storage.database.clone(), PathBuf::from)
        },
        Path::to_path_buf,
    );
    if chosen.is_absolute() {
        chosen
    } else {
        project_root.join(chosen)
    }
}

fn resolve_output(cli_json: bool, user_output: Option<&str>) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some("pretty"),
            "text" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_database() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("valchain.sqlite3")
}

fn default_document_code() -> String {
    "CV-PA-01".to_string()
}

fn default_revision() -> String {
    "01".to_string()
}

const fn default_node_count() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.storage.database, PathBuf::from(".valchain/valchain.sqlite3"));
        assert_eq!(cfg.defaults.document_code, "CV-PA-01");
        assert_eq!(cfg.defaults.revision, "01");
        assert_eq!(cfg.defaults.node_count, 3);
        assert_eq!(cfg.export.format, ExportFormat::Json);
    }

    #[test]
    fn partial_project_config_keeps_other_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let path = project_config_path(root.path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(
            &path,
            "[defaults]\nauthor = \"Ana\"\nnode_count = 5\n\n[export]\nformat = \"yaml\"\n",
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load");
        assert_eq!(cfg.defaults.author, "Ana");
        assert_eq!(cfg.defaults.node_count, 5);
        assert_eq!(cfg.defaults.revision, "01");
        assert_eq!(cfg.export.format, ExportFormat::Yaml);
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir");
        let path = project_config_path(root.path());
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "[defaults\n").expect("write config");
        assert!(load_project_config(root.path()).is_err());
    }

    #[test]
    fn default_config_is_written_once() {
        let root = tempfile::tempdir().expect("temp dir");
        assert!(write_default_project_config(root.path()).expect("first write"));
        assert!(!write_default_project_config(root.path()).expect("second write"));
        let cfg = load_project_config(root.path()).expect("load");
        assert_eq!(cfg, ProjectConfig::default());
    }

    #[test]
    fn cli_db_beats_env_beats_config() {
        let root = Path::new("/project");
        let storage = StorageConfig::default();

        let from_config = resolve_database_path(root, &storage, None, None);
        assert_eq!(from_config, PathBuf::from("/project/.valchain/valchain.sqlite3"));

        let from_env =
            resolve_database_path(root, &storage, None, Some("/tmp/env.sqlite3".to_string()));
        assert_eq!(from_env, PathBuf::from("/tmp/env.sqlite3"));

        let from_cli = resolve_database_path(
            root,
            &storage,
            Some(Path::new("cli.sqlite3")),
            Some("/tmp/env.sqlite3".to_string()),
        );
        assert_eq!(from_cli, PathBuf::from("/project/cli.sqlite3"));
    }

    #[test]
    fn blank_env_db_is_ignored() {
        let storage = StorageConfig::default();
        let path = resolve_database_path(Path::new("/p"), &storage, None, Some("  ".to_string()));
        assert_eq!(path, PathBuf::from("/p/.valchain/valchain.sqlite3"));
    }

    #[test]
    fn cli_json_overrides_user_config() {
        assert_eq!(resolve_output(true, Some("pretty")), "json");
        assert_eq!(resolve_output(false, Some("JSON")), "json");
    }

    #[test]
    fn defaults_build_document_dated_today() {
        let defaults = DefaultsConfig {
            author: "Ana".to_string(),
            ..DefaultsConfig::default()
        };
        let doc = defaults.document();
        assert_eq!(doc.code, "CV-PA-01");
        assert_eq!(doc.author, "Ana");
        assert!(doc.parsed_date().is_some());
    }

    #[test]
    fn user_config_parses_output() {
        let cfg: UserConfig = toml::from_str("output = \"json\"\n").expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
    }
}
