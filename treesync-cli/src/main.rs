//! treesync — mirror a local directory onto an FTP server.
//!
//! # Usage
//!
//! ```text
//! treesync init --name <name> (--server <host> --username <user> | --mirror-dir <dir>) [...]
//! treesync plan [--profile <name>] [target flags] [--json]
//! treesync sync [--profile <name>] [target flags] [--dry-run]
//! ```
//!
//! Target flags fall back to the `INPUT_*` environment variables
//! (`INPUT_SERVER`, `INPUT_USERNAME`, `INPUT_PASSWORD`, `INPUT_PORT`,
//! `INPUT_LOCAL_DIR`, `INPUT_SERVER_DIR`), then to the selected profile.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, plan::PlanArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "treesync",
    version,
    about = "Publish a local directory to an FTP server, uploading only what changed",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Save a named sync profile.
    Init(InitArgs),

    /// Show what a sync would remove and add.
    Plan(PlanArgs),

    /// Converge the remote directory onto the local one.
    Sync(SyncArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Sync(args) => args.run(),
    }
}

/// Log to stderr so `--json` output stays machine-readable. Library crates
/// log through `log`; the subscriber picks those records up.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
