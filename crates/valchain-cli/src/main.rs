#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::Context;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use valchain_core::config;
use valchain_core::error::ErrorCode;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "vchain: value-chain process modeler",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Database file (overrides VALCHAIN_DB and `[storage] database`).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Initialize a valchain project",
        long_about = "Write .valchain/config.toml and create the database in the current directory.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    vchain init\n\n    # Use a database elsewhere\n    vchain --db /data/chains.sqlite3 init"
    )]
    Init,

    #[command(
        next_help_heading = "Lifecycle",
        about = "Create a value chain",
        long_about = "Create a chain with one row of empty nodes and its document.",
        after_help = "EXAMPLES:\n    # Create a chain with the default three nodes\n    vchain create --name Vendas\n\n    # Override document fields\n    vchain create --name Compras --nodes 5 --code CV-CP-01 --author Ana\n\n    # Emit machine-readable output\n    vchain create --name Vendas --json"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Read",
        about = "List value chains",
        long_about = "List stored chains with their document metadata, newest first.",
        after_help = "EXAMPLES:\n    # List chains\n    vchain list\n\n    # Emit machine-readable output\n    vchain list --json"
    )]
    List,

    #[command(
        next_help_heading = "Read",
        about = "Show one value chain",
        long_about = "Show a chain's document, rows and nodes.",
        after_help = "EXAMPLES:\n    # Show chain 1\n    vchain show 1\n\n    # Emit machine-readable output\n    vchain show 1 --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Add or delete rows",
        after_help = "EXAMPLES:\n    # Append a row to chain 1\n    vchain row add 1\n\n    # Delete row 4 of chain 1\n    vchain row delete 1 4"
    )]
    Row {
        #[command(subcommand)]
        command: cmd::row::RowCommand,
    },

    #[command(
        next_help_heading = "Edit",
        about = "Add, update or delete nodes",
        after_help = "EXAMPLES:\n    # Append a node to row 2 of chain 1\n    vchain node add 1 2\n\n    # Label node 7\n    vchain node update 1 7 --text \"Aprovação\" --description \"Aprova o pedido\"\n\n    # Delete node 7\n    vchain node delete 1 7"
    )]
    Node {
        #[command(subcommand)]
        command: cmd::node::NodeCommand,
    },

    #[command(
        next_help_heading = "Interoperability",
        about = "Export a chain snapshot",
        long_about = "Write a JSON or YAML snapshot of a chain's full tree.",
        after_help = "EXAMPLES:\n    # Write Vendas.json in the project root\n    vchain export 1\n\n    # YAML to stdout\n    vchain export 1 --format yaml --output -"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Delete a value chain",
        long_about = "Delete a chain with its rows, nodes and document.",
        after_help = "EXAMPLES:\n    # Delete chain 1\n    vchain delete 1"
    )]
    Delete(cmd::delete::DeleteArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("VALCHAIN_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "valchain=debug,info"
        } else {
            "valchain=info,warn"
        })
    });

    let format = env::var("VALCHAIN_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn build_context(cli: &Cli) -> anyhow::Result<Context> {
    let project_root = env::current_dir()?;
    let effective = config::resolve_config(&project_root, cli.json, cli.db.as_deref())?;
    debug!(database = %effective.database.display(), output = %effective.resolved_output, "resolved config");
    Ok(Context {
        project_root,
        database: effective.database,
        project: effective.project,
        output: OutputMode::from_resolved(&effective.resolved_output),
    })
}

fn run(cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init => cmd::init::run_init(ctx),
        Commands::Create(args) => cmd::create::run_create(args, ctx),
        Commands::List => cmd::list::run_list(ctx),
        Commands::Show(args) => cmd::show::run_show(args, ctx),
        Commands::Row { command } => cmd::row::run_row(command, ctx),
        Commands::Node { command } => cmd::node::run_node(command, ctx),
        Commands::Export(args) => cmd::export::run_export(args, ctx),
        Commands::Delete(args) => cmd::delete::run_delete(args, ctx),
    }
}

fn report(mode: OutputMode, error: &CliError) {
    if render_error(mode, error).is_err() {
        eprintln!("error: {}", error.message);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = match build_context(&cli) {
        Ok(ctx) => ctx,
        Err(err) => {
            let mode = if cli.json {
                OutputMode::Json
            } else {
                OutputMode::Pretty
            };
            report(
                mode,
                &CliError::coded(ErrorCode::ConfigParseError, format!("{err:#}")),
            );
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "command failed");
            report(ctx.output, &CliError::from_anyhow(&err));
            ExitCode::FAILURE
        }
    }
}
