//! # dg-cli
//!
//! Command-line interface for devgate.
//!
//! - `dg validate`: load the project configuration and report violations
//! - `dg resolve <path>`: show the effective directory policy for a path
//! - `dg decide <operation> <path> --phase <phase>`: ask for a decision,
//!   export it to the audit log, exit non-zero when denied
//! - `dg audit verify/tail`: inspect the exported audit log

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// devgate: policy decisions for scaffolding and workflow gates.
#[derive(Parser)]
#[command(name = "dg", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the project configuration.
    Validate,
    /// Show the effective directory policy for a path.
    Resolve {
        /// Project-relative (or absolute, under the declared root) path.
        path: String,
        /// Print JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
    /// Decide whether an operation is allowed.
    Decide(commands::decide::DecideArgs),
    /// Inspect the exported audit log.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let project = dg_config::Project::open(&project_root)?;

    match &cli.command {
        Commands::Validate => commands::validate::execute(&project),
        Commands::Resolve { path, json } => commands::resolve::execute(&project, path, *json),
        Commands::Decide(args) => commands::decide::execute(&project, args),
        Commands::Audit { command } => commands::audit::execute(command, &project),
    }
}
