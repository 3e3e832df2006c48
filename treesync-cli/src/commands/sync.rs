//! `treesync sync` — converge the remote directory onto the local one.

use anyhow::{Context, Result};
use clap::Args;
use treesync_sync::{
    pipeline::{self, SyncOptions, SyncReport},
    Action,
};

use super::{Session, TargetArgs};

/// Arguments for `treesync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Show what would change without touching the remote.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = self.target.resolve()?;
        let mut opts = SyncOptions::from(&config);
        opts.dry_run = self.dry_run;

        let mut session = Session::open(&config.target)?;
        let report = pipeline::run(session.remote(), &opts)
            .with_context(|| format!("sync to {} failed", config.target))?;
        session.close()?;

        print_report(&report, self.dry_run);
        Ok(())
    }
}

fn print_report(report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    if report.actions.is_empty() {
        println!("{prefix}✓ nothing to do");
        return;
    }

    println!(
        "{prefix}✓ synced ({} removed, {} added)",
        report.removed(),
        report.added()
    );
    for action in &report.actions {
        let marker = match action {
            Action::Deleted { .. } | Action::RemovedDir { .. } => "-",
            Action::CreatedDir { .. } | Action::Uploaded { .. } => "+",
            Action::WouldRemove { .. } | Action::WouldAdd { .. } => "~",
        };
        println!("  {marker}  {action}");
    }
    if report.manifest_written {
        println!("  ✎  manifest updated");
    }
}
