//! `treesync plan` — show what a sync would remove and add.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use treesync_core::EntryKind;
use treesync_sync::{
    pipeline::{self, SyncOptions},
    Plan, PlanItem,
};

use super::{Session, TargetArgs};

/// Arguments for `treesync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let config = self.target.resolve()?;
        let opts = SyncOptions::from(&config);

        let mut session = Session::open(&config.target)?;
        let plan = pipeline::plan(session.remote(), &opts)
            .with_context(|| format!("planning against {} failed", config.target))?;
        session.close()?;

        if self.json {
            return print_json(&plan);
        }
        print_table(&plan, &config.target.to_string(), &opts.server_dir);
        Ok(())
    }
}

#[derive(Serialize)]
struct PlanJson {
    remove: Vec<PlanItem>,
    add: Vec<PlanItem>,
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "op")]
    op: &'static str,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "kind")]
    kind: EntryKind,
}

fn print_json(plan: &Plan) -> Result<()> {
    let payload = PlanJson {
        remove: plan.removals(),
        add: plan.additions(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize plan JSON")?
    );
    Ok(())
}

fn print_table(plan: &Plan, target: &str, server_dir: &str) {
    println!("{} {target} ({server_dir})", "Plan for".bold());
    if plan.is_empty() {
        println!("{} remote is up to date", "✓".green());
        return;
    }

    let removals = plan.removals();
    let additions = plan.additions();
    let rows: Vec<PlanRow> = removals
        .iter()
        .map(|item| row("-", item))
        .chain(additions.iter().map(|item| row("+", item)))
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{} to remove, {} to add",
        removals.len().to_string().red().bold(),
        additions.len().to_string().green().bold(),
    );
}

fn row(op: &'static str, item: &PlanItem) -> PlanRow {
    let path = match item.kind {
        EntryKind::Dir => format!("{}/", item.path),
        EntryKind::File => item.path.clone(),
    };
    PlanRow {
        op,
        path,
        kind: item.kind,
    }
}
