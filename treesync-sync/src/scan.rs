//! Local tree scanner.
//!
//! Produces the desired tree: every file carries `size` and `sha256`, no
//! entry carries `modified`. Symbolic links are followed; anything that is
//! neither a file nor a directory is skipped.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use treesync_core::{DirectoryContent, Entry};

use crate::error::{io_err, SyncError};
use crate::reconcile::join_path;

/// Scan `root` recursively.
///
/// `exclude` holds `/`-separated paths relative to `root`; a matching file
/// or directory (with everything below it) is left out.
pub fn scan_dir(root: &Path, exclude: &[String]) -> Result<DirectoryContent, SyncError> {
    let exclude: Vec<&str> = exclude.iter().map(|p| normalize(p)).collect();
    scan_at(root, "", &exclude)
}

fn scan_at(dir: &Path, rel: &str, exclude: &[&str]) -> Result<DirectoryContent, SyncError> {
    let mut content = DirectoryContent::new();
    let read = fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for item in read {
        let item = item.map_err(|e| io_err(dir, e))?;
        let path = item.path();
        let Some(name) = item.file_name().to_str().map(str::to_owned) else {
            tracing::warn!("skipping non UTF-8 name: {}", path.display());
            continue;
        };
        let rel_path = join_path(rel, &name);
        if exclude.contains(&rel_path.as_str()) {
            tracing::debug!("excluded: {rel_path}");
            continue;
        }

        let meta = fs::metadata(&path).map_err(|e| io_err(&path, e))?;
        let entry = if meta.is_dir() {
            Entry::dir(name.clone(), scan_at(&path, &rel_path, exclude)?)
        } else if meta.is_file() {
            Entry::file(name.clone(), Some(meta.len()), Some(hash_file(&path)?))
        } else {
            tracing::debug!("skipping special file: {}", path.display());
            continue;
        };
        content.insert(name, entry);
    }
    Ok(content)
}

/// SHA-256 of a file's bytes, lowercase hex.
pub fn hash_file(path: &Path) -> Result<String, SyncError> {
    let mut file = File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| io_err(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

fn normalize(path: &str) -> &str {
    let path = path.trim_start_matches("./");
    path.trim_matches('/')
}
