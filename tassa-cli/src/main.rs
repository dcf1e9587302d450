//! tassa: declarative TaskRouter workspace reconciliation.
//!
//! # Usage
//!
//! ```text
//! tassa validate <file>
//! tassa apply <file> [--dry-run] [--json]
//! tassa diff <file>
//! tassa show (--sid <sid> | --name <name>) [--json]
//! tassa profile set --account-sid <sid> --auth-token <token> [--base-url <url>] [--timeout-secs <n>]
//! tassa profile show
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG` to change the level.

mod commands;
mod remote;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    apply::ApplyArgs, diff::DiffArgs, profile::ProfileCommand, show::ShowArgs,
    validate::ValidateArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tassa",
    version,
    about = "Reconcile TaskRouter workspaces against a desired-state document",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a desired-state document without contacting the remote.
    Validate(ValidateArgs),

    /// Bring the target workspace in line with a document.
    Apply(ApplyArgs),

    /// Show field-level differences between a document and the workspace.
    Diff(DiffArgs),

    /// Print every resource of a workspace.
    Show(ShowArgs),

    /// Manage the stored credential profile.
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Validate(args) => args.run(),
        Commands::Apply(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Show(args) => args.run(),
        Commands::Profile { command } => commands::profile::run(command),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
