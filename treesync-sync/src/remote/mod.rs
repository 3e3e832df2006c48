//! Remote sessions.
//!
//! A [`Remote`] is a stateful session with a single current-directory
//! cursor, the way an FTP control connection works: every operation acts on
//! a name inside the current directory. Callers navigate with
//! [`with_cwd`], which always returns the cursor to where it started.

pub mod dir;
pub mod ftp;

use std::io::Read;

use treesync_core::{DirectoryContent, Entry, EntryKind};

use crate::error::{remote_err, SyncError};
use crate::reconcile::join_path;

pub use dir::DirRemote;
pub use ftp::FtpRemote;

/// One item of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: Option<u64>,
    /// Protocol timestamp, compared as an opaque string.
    pub modified: Option<String>,
}

/// A remote session rooted at some login directory.
pub trait Remote {
    /// Current directory as reported by the remote.
    fn pwd(&mut self) -> Result<String, SyncError>;

    /// Enter the child directory `dir`.
    fn cwd(&mut self, dir: &str) -> Result<(), SyncError>;

    /// Return to the parent directory.
    fn cdup(&mut self) -> Result<(), SyncError>;

    /// List the current directory, without `.` and `..`.
    fn list(&mut self) -> Result<Vec<RemoteEntry>, SyncError>;

    fn mkdir(&mut self, name: &str) -> Result<(), SyncError>;

    /// Remove an empty directory.
    fn rmdir(&mut self, name: &str) -> Result<(), SyncError>;

    /// Delete a file.
    fn delete(&mut self, name: &str) -> Result<(), SyncError>;

    /// Store `data` as `name`, replacing any existing file. Returns bytes written.
    fn upload(&mut self, name: &str, data: &mut dyn Read) -> Result<u64, SyncError>;

    /// Fetch a file's bytes; `None` when it does not exist.
    fn retrieve(&mut self, name: &str) -> Result<Option<Vec<u8>>, SyncError>;
}

/// Non-empty path components, `.` dropped.
///
/// `"./www//site/"` → `["www", "site"]`.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}

/// Run `f` inside `path`, creating missing components when `make_dir`.
///
/// The cursor is moved back to the starting directory whether or not `f`
/// succeeds.
pub fn with_cwd<R, T, F>(remote: &mut R, path: &str, make_dir: bool, f: F) -> Result<T, SyncError>
where
    R: Remote + ?Sized,
    F: FnOnce(&mut R) -> Result<T, SyncError>,
{
    match with_existing_cwd_impl(remote, path, make_dir, f)? {
        Some(value) => Ok(value),
        None => Err(remote_err("cwd", path, "no such directory")),
    }
}

/// Like [`with_cwd`] without creating anything; `Ok(None)` when a
/// component of `path` does not exist.
pub fn with_existing_cwd<R, T, F>(remote: &mut R, path: &str, f: F) -> Result<Option<T>, SyncError>
where
    R: Remote + ?Sized,
    F: FnOnce(&mut R) -> Result<T, SyncError>,
{
    with_existing_cwd_impl(remote, path, false, f)
}

fn with_existing_cwd_impl<R, T, F>(
    remote: &mut R,
    path: &str,
    make_dir: bool,
    f: F,
) -> Result<Option<T>, SyncError>
where
    R: Remote + ?Sized,
    F: FnOnce(&mut R) -> Result<T, SyncError>,
{
    let parts = split_path(path);
    let mut depth = 0;
    let entered = enter(remote, &parts, make_dir, &mut depth);
    let result = match entered {
        Ok(true) => f(remote).map(Some),
        Ok(false) => Ok(None),
        Err(e) => Err(e),
    };
    let restored = leave(remote, depth);
    let value = result?;
    restored?;
    Ok(value)
}

fn enter<R: Remote + ?Sized>(
    remote: &mut R,
    parts: &[&str],
    make_dir: bool,
    depth: &mut usize,
) -> Result<bool, SyncError> {
    for part in parts {
        match lookup(remote, part)? {
            Some(EntryKind::Dir) => {}
            Some(EntryKind::File) => {
                return Err(SyncError::NotADirectory {
                    path: part.to_string(),
                })
            }
            None if make_dir => {
                tracing::info!("mkdir '{part}'");
                remote.mkdir(part)?;
            }
            None => return Ok(false),
        }
        remote.cwd(part)?;
        *depth += 1;
    }
    Ok(true)
}

fn leave<R: Remote + ?Sized>(remote: &mut R, depth: usize) -> Result<(), SyncError> {
    for _ in 0..depth {
        remote.cdup()?;
    }
    Ok(())
}

fn lookup<R: Remote + ?Sized>(remote: &mut R, name: &str) -> Result<Option<EntryKind>, SyncError> {
    Ok(remote
        .list()?
        .into_iter()
        .find(|item| item.name == name)
        .map(|item| item.kind))
}

/// List the current directory recursively.
///
/// Files carry `size` and `modified`, never `sha256`. `exclude` holds
/// `/`-separated paths relative to the current directory.
pub fn list_tree<R: Remote + ?Sized>(
    remote: &mut R,
    exclude: &[String],
) -> Result<DirectoryContent, SyncError> {
    let exclude: Vec<&str> = exclude
        .iter()
        .map(|p| p.trim_start_matches("./").trim_matches('/'))
        .collect();
    list_at(remote, "", &exclude)
}

fn list_at<R: Remote + ?Sized>(
    remote: &mut R,
    rel: &str,
    exclude: &[&str],
) -> Result<DirectoryContent, SyncError> {
    let mut content = DirectoryContent::new();
    for item in remote.list()? {
        let rel_path = join_path(rel, &item.name);
        if exclude.contains(&rel_path.as_str()) {
            continue;
        }
        let entry = match item.kind {
            EntryKind::File => Entry::file(item.name.clone(), item.size, None),
            EntryKind::Dir => {
                remote.cwd(&item.name)?;
                let children = list_at(remote, &rel_path, exclude);
                remote.cdup()?;
                Entry::dir(item.name.clone(), children?)
            }
        };
        content.insert(item.name, entry.with_modified(item.modified));
    }
    Ok(content)
}
