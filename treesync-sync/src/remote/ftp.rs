//! FTP session over `suppaftp`.
//!
//! Listings use MLSD (RFC 3659), which is the only FTP listing with a
//! machine-readable size and modification time.

use std::io::Read;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};

use treesync_core::EntryKind;

use crate::error::{remote_err, SyncError};

use super::{Remote, RemoteEntry};

/// An authenticated FTP control connection in binary transfer mode.
pub struct FtpRemote {
    stream: FtpStream,
    /// Cached working directory, for error messages.
    cwd: String,
}

impl FtpRemote {
    pub fn connect(
        server: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, SyncError> {
        let address = format!("{server}:{port}");
        let mut stream = FtpStream::connect((server, port))
            .map_err(|e| remote_err("connect", address.as_str(), e))?;
        stream
            .login(username, password)
            .map_err(|e| remote_err("login", address.as_str(), e))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| remote_err("type", address.as_str(), e))?;
        let cwd = stream
            .pwd()
            .map_err(|e| remote_err("pwd", address.as_str(), e))?;
        tracing::info!("connected to {address} as '{username}', cwd '{cwd}'");
        Ok(Self { stream, cwd })
    }

    /// Close the control connection politely.
    pub fn quit(mut self) -> Result<(), SyncError> {
        let cwd = self.cwd.clone();
        self.stream.quit().map_err(|e| remote_err("quit", cwd, e))
    }

    fn at(&self, name: &str) -> String {
        format!("{}/{}", self.cwd.trim_end_matches('/'), name)
    }

    fn refresh_cwd(&mut self) -> Result<(), SyncError> {
        self.cwd = self
            .stream
            .pwd()
            .map_err(|e| remote_err("pwd", self.cwd.clone(), e))?;
        Ok(())
    }
}

impl Remote for FtpRemote {
    fn pwd(&mut self) -> Result<String, SyncError> {
        self.refresh_cwd()?;
        Ok(self.cwd.clone())
    }

    fn cwd(&mut self, dir: &str) -> Result<(), SyncError> {
        let target = self.at(dir);
        self.stream
            .cwd(dir)
            .map_err(|e| remote_err("cwd", target, e))?;
        self.refresh_cwd()
    }

    fn cdup(&mut self) -> Result<(), SyncError> {
        let at = self.cwd.clone();
        self.stream.cdup().map_err(|e| remote_err("cdup", at, e))?;
        self.refresh_cwd()
    }

    fn list(&mut self) -> Result<Vec<RemoteEntry>, SyncError> {
        let lines = self
            .stream
            .mlsd(None)
            .map_err(|e| remote_err("mlsd", self.cwd.clone(), e))?;
        let mut items: Vec<RemoteEntry> = lines
            .iter()
            .filter_map(|line| {
                let parsed = parse_mlsd_line(line);
                if parsed.is_none() {
                    tracing::debug!("{}> skipping MLSD line '{}'", self.cwd, line.trim_end());
                }
                parsed
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    fn mkdir(&mut self, name: &str) -> Result<(), SyncError> {
        let target = self.at(name);
        self.stream
            .mkdir(name)
            .map_err(|e| remote_err("mkdir", target, e))
    }

    fn rmdir(&mut self, name: &str) -> Result<(), SyncError> {
        let target = self.at(name);
        self.stream
            .rmdir(name)
            .map_err(|e| remote_err("rmdir", target, e))
    }

    fn delete(&mut self, name: &str) -> Result<(), SyncError> {
        let target = self.at(name);
        self.stream.rm(name).map_err(|e| remote_err("delete", target, e))
    }

    fn upload(&mut self, name: &str, mut data: &mut dyn Read) -> Result<u64, SyncError> {
        let target = self.at(name);
        self.stream
            .put_file(name, &mut data)
            .map_err(|e| remote_err("upload", target, e))
    }

    fn retrieve(&mut self, name: &str) -> Result<Option<Vec<u8>>, SyncError> {
        let target = self.at(name);
        match self.stream.retr_as_buffer(name) {
            Ok(cursor) => Ok(Some(cursor.into_inner())),
            // 550 and friends: the file is not there (or not readable, which
            // the caller treats the same way).
            Err(FtpError::UnexpectedResponse(response)) => {
                tracing::debug!("{target}: retrieve refused: {response:?}");
                Ok(None)
            }
            Err(e) => Err(remote_err("retrieve", target, e)),
        }
    }
}

/// Parse one MLSD line: `fact=value;fact=value; name`.
///
/// Returns `None` for `cdir` / `pdir` entries, links and malformed lines.
pub fn parse_mlsd_line(line: &str) -> Option<RemoteEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (facts, name) = line.split_once(' ')?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }

    let mut kind = None;
    let mut size = None;
    let mut modified = None;
    for fact in facts.split(';').filter(|f| !f.is_empty()) {
        let (key, value) = fact.split_once('=')?;
        match key.to_ascii_lowercase().as_str() {
            "type" => {
                kind = match value.to_ascii_lowercase().as_str() {
                    "file" => Some(EntryKind::File),
                    "dir" => Some(EntryKind::Dir),
                    _ => None,
                }
            }
            "size" => size = value.parse::<u64>().ok(),
            "modify" => modified = Some(value.to_string()),
            _ => {}
        }
    }

    let kind = kind?;
    Some(RemoteEntry {
        name: name.to_string(),
        kind,
        size: if kind == EntryKind::File { size } else { None },
        modified,
    })
}
