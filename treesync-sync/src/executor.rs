//! Plan execution against a remote session.
//!
//! Removals run first, depth-first, so that a directory is empty by the time
//! it is removed and a name freed by a removal can be reused by an addition.
//! The remote cursor must sit in the server directory on entry and is back
//! there on return, also on error.

use std::fmt;
use std::fs::File;
use std::path::Path;

use serde::Serialize;

use treesync_core::{ChangeCode, DirectoryContent, Entry, EntryKind};

use crate::error::{io_err, SyncError};
use crate::reconcile::{join_path, Plan};
use crate::remote::Remote;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// One remote mutation, performed or (in dry-run) intended.
///
/// Paths are `/`-separated and relative to the server directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Deleted { path: String },
    RemovedDir { path: String },
    CreatedDir { path: String },
    Uploaded { path: String, bytes: u64 },
    WouldRemove { path: String, kind: EntryKind },
    WouldAdd { path: String, kind: EntryKind },
}

impl Action {
    /// True for removals, performed or intended.
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            Action::Deleted { .. } | Action::RemovedDir { .. } | Action::WouldRemove { .. }
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Deleted { path } => write!(f, "deleted {path}"),
            Action::RemovedDir { path } => write!(f, "removed {path}/"),
            Action::CreatedDir { path } => write!(f, "created {path}/"),
            Action::Uploaded { path, bytes } => write!(f, "uploaded {path} ({bytes} bytes)"),
            Action::WouldRemove { path, kind } => write!(f, "would remove {kind} {path}"),
            Action::WouldAdd { path, kind } => write!(f, "would add {kind} {path}"),
        }
    }
}

/// The actions `execute` would perform, without a remote.
pub fn preview(plan: &Plan) -> Vec<Action> {
    let removals = plan.removals().into_iter().map(|item| Action::WouldRemove {
        path: item.path,
        kind: item.kind,
    });
    let additions = plan.additions().into_iter().map(|item| Action::WouldAdd {
        path: item.path,
        kind: item.kind,
    });
    removals.chain(additions).collect()
}

// ---------------------------------------------------------------------------
// execute
// ---------------------------------------------------------------------------

/// Apply `plan` to the remote, reading added files from `local_root`.
///
/// A failed `mkdir` or `rmdir` is logged and skipped: the directory may
/// already exist, or still hold files the listing did not show. Every other
/// failure aborts the run.
pub fn execute<R: Remote + ?Sized>(
    remote: &mut R,
    plan: &Plan,
    local_root: &Path,
) -> Result<Vec<Action>, SyncError> {
    let mut run = Executor {
        remote,
        base: String::new(),
        local_root,
        actions: Vec::new(),
    };
    run.base = run.remote.pwd()?;
    run.remove(&plan.to_remove, "")?;
    run.add(&plan.to_add, "")?;
    Ok(run.actions)
}

struct Executor<'a, R: Remote + ?Sized> {
    remote: &'a mut R,
    /// Server directory as reported by the remote, for log lines.
    base: String,
    local_root: &'a Path,
    actions: Vec<Action>,
}

impl<R: Remote + ?Sized> Executor<'_, R> {
    fn remove(&mut self, tree: &DirectoryContent, rel: &str) -> Result<(), SyncError> {
        for (name, entry) in tree {
            let path = join_path(rel, name);
            let tagged = entry.changed.code() == Some(ChangeCode::Remove);
            match entry.content() {
                Some(children) => {
                    if !children.is_empty() {
                        self.within(name, |run| run.remove(children, &path))?;
                    }
                    if tagged {
                        tracing::info!("{}> rmdir '{path}'", self.base);
                        match self.remote.rmdir(name) {
                            Ok(()) => self.actions.push(Action::RemovedDir { path }),
                            Err(e) => tracing::warn!("{}> {e}", self.base),
                        }
                    }
                }
                None if tagged => {
                    tracing::info!("{}> delete '{path}'", self.base);
                    self.remote.delete(name)?;
                    self.actions.push(Action::Deleted { path });
                }
                None => tracing::debug!("{}> keep '{path}'", self.base),
            }
        }
        Ok(())
    }

    fn add(&mut self, tree: &DirectoryContent, rel: &str) -> Result<(), SyncError> {
        for (name, entry) in tree {
            let path = join_path(rel, name);
            let tagged = entry.changed.code() == Some(ChangeCode::Add);
            match entry.content() {
                Some(children) => {
                    if tagged {
                        tracing::info!("{}> mkdir '{path}'", self.base);
                        match self.remote.mkdir(name) {
                            Ok(()) => self.actions.push(Action::CreatedDir { path: path.clone() }),
                            Err(e) => tracing::warn!("{}> {e}", self.base),
                        }
                    }
                    if !children.is_empty() {
                        self.within(name, |run| run.add(children, &path))?;
                    }
                }
                None if tagged => self.upload(entry, path)?,
                None => tracing::debug!("{}> keep '{path}'", self.base),
            }
        }
        Ok(())
    }

    fn upload(&mut self, entry: &Entry, path: String) -> Result<(), SyncError> {
        let source = self.local_root.join(&path);
        let mut file = File::open(&source).map_err(|e| io_err(&source, e))?;
        tracing::info!("{}> upload '{path}'", self.base);
        let bytes = self.remote.upload(&entry.name, &mut file)?;
        self.actions.push(Action::Uploaded { path, bytes });
        Ok(())
    }

    /// Run `f` inside the child directory `name`, returning to the parent
    /// even when `f` fails.
    fn within<F>(&mut self, name: &str, f: F) -> Result<(), SyncError>
    where
        F: FnOnce(&mut Self) -> Result<(), SyncError>,
    {
        self.remote.cwd(name)?;
        let result = f(self);
        let back = self.remote.cdup();
        result?;
        back
    }
}
