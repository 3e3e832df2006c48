//! Sync pipeline entrypoint used by the CLI.
//!
//! One run: scan the local tree, observe the remote (listing + manifest),
//! plan, execute, then publish the next manifest.

use std::path::PathBuf;

use chrono::Utc;

use treesync_core::{manifest, DirectoryContent, Manifest, SyncConfig};

use crate::error::SyncError;
use crate::executor::{self, Action};
use crate::reconcile::{create_update_list, merge_entries, merge_modified, Plan};
use crate::remote::{list_tree, with_cwd, with_existing_cwd, Remote};
use crate::scan::scan_dir;

/// Parameters of a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub local_dir: PathBuf,
    /// Remote directory, relative to the login directory.
    pub server_dir: String,
    pub manifest_name: String,
    /// Paths relative to both roots that are never synced.
    pub exclude: Vec<String>,
    pub dry_run: bool,
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            local_dir: config.local_dir.clone(),
            server_dir: config.server_dir.clone(),
            manifest_name: config.manifest_name.clone(),
            exclude: config.exclude.clone(),
            dry_run: false,
        }
    }
}

impl SyncOptions {
    fn excluded(&self) -> Vec<String> {
        let mut exclude = self.exclude.clone();
        exclude.push(self.manifest_name.clone());
        exclude
    }
}

/// Outcome of [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub plan: Plan,
    pub actions: Vec<Action>,
    /// Whether a new manifest was uploaded.
    pub manifest_written: bool,
}

impl SyncReport {
    pub fn removed(&self) -> usize {
        self.actions.iter().filter(|a| a.is_removal()).count()
    }

    pub fn added(&self) -> usize {
        self.actions.len() - self.removed()
    }
}

/// Compute the plan without touching the remote.
///
/// A server directory that does not exist yet is observed as empty.
pub fn plan<R: Remote + ?Sized>(remote: &mut R, opts: &SyncOptions) -> Result<Plan, SyncError> {
    let exclude = opts.excluded();
    let local = scan_dir(&opts.local_dir, &exclude)?;
    plan_existing(remote, opts, &local)
}

/// Run the full pipeline; with `opts.dry_run` this is [`plan`] plus a
/// preview of the actions.
pub fn run<R: Remote + ?Sized>(remote: &mut R, opts: &SyncOptions) -> Result<SyncReport, SyncError> {
    let started_at = Utc::now();
    let exclude = opts.excluded();
    let local = scan_dir(&opts.local_dir, &exclude)?;

    if opts.dry_run {
        let plan = plan_existing(remote, opts, &local)?;
        let actions = executor::preview(&plan);
        tracing::info!("[dry-run] {} action(s) planned", actions.len());
        return Ok(SyncReport {
            plan,
            actions,
            manifest_written: false,
        });
    }

    with_cwd(remote, &opts.server_dir, true, |remote| {
        let plan = plan_here(remote, opts, &local)?;
        if plan.is_empty() {
            tracing::info!("remote is up to date");
            return Ok(SyncReport {
                plan,
                actions: Vec::new(),
                manifest_written: false,
            });
        }

        let actions = executor::execute(remote, &plan, &opts.local_dir)?;

        let relisted = list_tree(remote, &exclude)?;
        let next = Manifest::new(merge_modified(&local, &relisted), started_at);
        let bytes = manifest::encode(&next)?;
        remote.upload(&opts.manifest_name, &mut bytes.as_slice())?;
        tracing::info!("manifest '{}' updated", opts.manifest_name);

        Ok(SyncReport {
            plan,
            actions,
            manifest_written: true,
        })
    })
}

fn plan_existing<R: Remote + ?Sized>(
    remote: &mut R,
    opts: &SyncOptions,
    local: &DirectoryContent,
) -> Result<Plan, SyncError> {
    match with_existing_cwd(remote, &opts.server_dir, |remote| plan_here(remote, opts, local))? {
        Some(plan) => Ok(plan),
        None => {
            tracing::info!("server directory '{}' does not exist yet", opts.server_dir);
            Ok(create_update_list(local, &DirectoryContent::new()))
        }
    }
}

/// Plan against the current remote directory.
fn plan_here<R: Remote + ?Sized>(
    remote: &mut R,
    opts: &SyncOptions,
    local: &DirectoryContent,
) -> Result<Plan, SyncError> {
    let listed = list_tree(remote, &opts.excluded())?;
    let trusted = load_manifest(remote, &opts.manifest_name)?;
    let annotated = merge_entries(&listed, &trusted);
    Ok(create_update_list(local, &annotated))
}

/// Fetch the previous manifest's tree; empty when it is missing or
/// unreadable, which makes every remote file untrusted.
fn load_manifest<R: Remote + ?Sized>(
    remote: &mut R,
    name: &str,
) -> Result<DirectoryContent, SyncError> {
    let Some(bytes) = remote.retrieve(name)? else {
        tracing::info!("no manifest '{name}' on the remote, first sync");
        return Ok(DirectoryContent::new());
    };
    match manifest::decode(&bytes) {
        Ok(manifest) => {
            if let Some(at) = manifest.synced_at {
                tracing::debug!("manifest '{name}' written at {at}");
            }
            Ok(manifest.files)
        }
        Err(e) => {
            tracing::warn!("ignoring unreadable manifest '{name}': {e}");
            Ok(DirectoryContent::new())
        }
    }
}
