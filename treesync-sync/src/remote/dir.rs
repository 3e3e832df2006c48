//! A local directory acting as the remote.
//!
//! Useful for mounted network shares and for exercising the full pipeline
//! without a server. Timestamps are reported the way MLSD reports them
//! (`YYYYMMDDHHMMSS`, UTC) so manifests are interchangeable with FTP ones.

use std::fs::{self, File};
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use treesync_core::EntryKind;

use crate::error::{io_err, remote_err, SyncError};

use super::{Remote, RemoteEntry};

/// Directory-backed [`Remote`] session.
#[derive(Debug)]
pub struct DirRemote {
    root: PathBuf,
    cwd: Vec<String>,
}

impl DirRemote {
    /// Open a session rooted at `root`, which must be an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SyncError> {
        let root = root.into();
        let meta = fs::metadata(&root).map_err(|e| io_err(&root, e))?;
        if !meta.is_dir() {
            return Err(SyncError::NotADirectory {
                path: root.display().to_string(),
            });
        }
        Ok(Self {
            root,
            cwd: Vec::new(),
        })
    }

    fn current(&self) -> PathBuf {
        self.cwd.iter().fold(self.root.clone(), |dir, part| dir.join(part))
    }

    fn display(&self, name: &str) -> String {
        let mut parts = self.cwd.clone();
        parts.push(name.to_string());
        format!("/{}", parts.join("/"))
    }

    /// Path of a direct child of the current directory.
    fn child(&self, op: &'static str, name: &str) -> Result<PathBuf, SyncError> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(remote_err(op, self.display(name), "invalid name"));
        }
        Ok(self.current().join(name))
    }
}

impl Remote for DirRemote {
    fn pwd(&mut self) -> Result<String, SyncError> {
        Ok(format!("/{}", self.cwd.join("/")))
    }

    fn cwd(&mut self, dir: &str) -> Result<(), SyncError> {
        if dir == ".." {
            return self.cdup();
        }
        let path = self.child("cwd", dir)?;
        if !path.is_dir() {
            return Err(remote_err("cwd", self.display(dir), "no such directory"));
        }
        self.cwd.push(dir.to_string());
        Ok(())
    }

    fn cdup(&mut self) -> Result<(), SyncError> {
        self.cwd.pop();
        Ok(())
    }

    fn list(&mut self) -> Result<Vec<RemoteEntry>, SyncError> {
        let dir = self.current();
        let mut items = Vec::new();
        for item in fs::read_dir(&dir).map_err(|e| io_err(&dir, e))? {
            let item = item.map_err(|e| io_err(&dir, e))?;
            let path = item.path();
            let Some(name) = item.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let meta = fs::metadata(&path).map_err(|e| io_err(&path, e))?;
            let kind = if meta.is_dir() {
                EntryKind::Dir
            } else if meta.is_file() {
                EntryKind::File
            } else {
                continue;
            };
            let modified = meta.modified().ok().map(|t| mlsd_timestamp(t.into()));
            items.push(RemoteEntry {
                name,
                kind,
                size: (kind == EntryKind::File).then_some(meta.len()),
                modified,
            });
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    fn mkdir(&mut self, name: &str) -> Result<(), SyncError> {
        let path = self.child("mkdir", name)?;
        fs::create_dir(&path).map_err(|e| remote_err("mkdir", self.display(name), e))
    }

    fn rmdir(&mut self, name: &str) -> Result<(), SyncError> {
        let path = self.child("rmdir", name)?;
        fs::remove_dir(&path).map_err(|e| remote_err("rmdir", self.display(name), e))
    }

    fn delete(&mut self, name: &str) -> Result<(), SyncError> {
        let path = self.child("delete", name)?;
        fs::remove_file(&path).map_err(|e| remote_err("delete", self.display(name), e))
    }

    fn upload(&mut self, name: &str, data: &mut dyn Read) -> Result<u64, SyncError> {
        let path = self.child("upload", name)?;
        let tmp = path.with_file_name(format!(".{name}.treesync.tmp"));
        atomic_copy(data, &tmp, &path)
    }

    fn retrieve(&mut self, name: &str) -> Result<Option<Vec<u8>>, SyncError> {
        let path = self.child("retrieve", name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

/// Write to `tmp`, then rename onto `path`; `tmp` never outlives a failure.
fn atomic_copy(data: &mut dyn Read, tmp: &Path, path: &Path) -> Result<u64, SyncError> {
    let written = File::create(tmp).and_then(|mut file| {
        let n = io::copy(data, &mut file)?;
        file.sync_all()?;
        Ok(n)
    });
    let written = match written {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(tmp);
            return Err(io_err(tmp, e));
        }
    };
    if let Err(e) = fs::rename(tmp, path) {
        let _ = fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    Ok(written)
}

/// MLSD `modify` fact format.
pub fn mlsd_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y%m%d%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    #[test]
    fn timestamp_matches_mlsd_format() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 9, 8, 7).unwrap();
        assert_eq!(mlsd_timestamp(t), "20240501090807");
    }

    #[test]
    fn list_reports_kind_size_and_mtime() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "abc").unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        set_file_mtime(tmp.path().join("a.txt"), FileTime::from_unix_time(1_700_000_000, 0))
            .unwrap();

        let mut remote = DirRemote::open(tmp.path()).unwrap();
        let items = remote.list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "a.txt");
        assert_eq!(items[0].kind, EntryKind::File);
        assert_eq!(items[0].size, Some(3));
        assert_eq!(items[0].modified.as_deref(), Some("20231114221320"));
        assert_eq!(items[1].kind, EntryKind::Dir);
        assert_eq!(items[1].size, None);
    }

    #[test]
    fn upload_replaces_atomically_and_retrieve_reads_back() {
        let tmp = TempDir::new().unwrap();
        let mut remote = DirRemote::open(tmp.path()).unwrap();
        remote.upload("f", &mut "first".as_bytes()).unwrap();
        let n = remote.upload("f", &mut "second".as_bytes()).unwrap();
        assert_eq!(n, 6);
        assert_eq!(remote.retrieve("f").unwrap().as_deref(), Some(&b"second"[..]));
        assert!(!tmp.path().join(".f.treesync.tmp").exists());
        assert_eq!(remote.retrieve("missing").unwrap(), None);
    }

    #[test]
    fn navigation_tracks_cursor() {
        let tmp = TempDir::new().unwrap();
        let mut remote = DirRemote::open(tmp.path()).unwrap();
        remote.mkdir("a").unwrap();
        remote.cwd("a").unwrap();
        remote.upload("inner", &mut "x".as_bytes()).unwrap();
        assert_eq!(remote.pwd().unwrap(), "/a");
        remote.cwd("..").unwrap();
        assert_eq!(remote.pwd().unwrap(), "/");
        assert!(tmp.path().join("a/inner").is_file());
    }

    #[test]
    fn rejects_names_escaping_the_cursor() {
        let tmp = TempDir::new().unwrap();
        let mut remote = DirRemote::open(tmp.path()).unwrap();
        assert!(remote.delete("../etc").is_err());
        assert!(remote.mkdir("").is_err());
        assert!(remote.cwd("nope").is_err());
    }

    #[test]
    fn rmdir_refuses_non_empty_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("d")).unwrap();
        fs::write(tmp.path().join("d/f"), "x").unwrap();
        let mut remote = DirRemote::open(tmp.path()).unwrap();
        let err = remote.rmdir("d").unwrap_err();
        assert!(matches!(err, SyncError::Remote { op: "rmdir", .. }), "got: {err}");
    }
}
