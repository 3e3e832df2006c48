//! Named sync profiles, stored as YAML.
//!
//! # Storage layout
//!
//! ```text
//! ~/.treesync/              (mode 0700)
//!   <profile>.yaml          (one file per profile — mode 0600)
//! ```
//!
//! # API pattern
//!
//! Every function touching the filesystem has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::manifest::MANIFEST_NAME;

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A strongly-typed profile name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileName(pub String);

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProfileName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProfileName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Where the mirrored tree lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Target {
    /// An FTP server with MLSD support.
    Ftp {
        server: String,
        #[serde(default = "default_port")]
        port: u16,
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    /// A directory on a locally mounted filesystem.
    Directory { root: PathBuf },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Ftp {
                server,
                port,
                username,
                ..
            } => write!(f, "ftp://{username}@{server}:{port}"),
            Target::Directory { root } => write!(f, "{}", root.display()),
        }
    }
}

/// A complete sync profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub target: Target,
    /// Local tree to publish.
    #[serde(default = "default_dir")]
    pub local_dir: PathBuf,
    /// Directory on the target, relative to its login/root directory.
    #[serde(default = "default_server_dir")]
    pub server_dir: String,
    #[serde(default = "default_manifest_name")]
    pub manifest_name: String,
    /// Relative paths never published.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl SyncConfig {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            local_dir: default_dir(),
            server_dir: default_server_dir(),
            manifest_name: default_manifest_name(),
            exclude: Vec::new(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_FTP_PORT
}

fn default_dir() -> PathBuf {
    PathBuf::from("./")
}

fn default_server_dir() -> String {
    "./".to_string()
}

fn default_manifest_name() -> String {
    MANIFEST_NAME.to_string()
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.treesync/<profile>.yaml` — pure, no I/O.
pub fn profile_path_at(home: &Path, profile: &ProfileName) -> PathBuf {
    home.join(".treesync").join(format!("{}.yaml", profile.0))
}

/// Lists the names of all saved profiles, sorted.
pub fn list_profiles_at(home: &Path) -> Result<Vec<ProfileName>, CoreError> {
    let dir = home.join(".treesync");
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut names: Vec<ProfileName> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.strip_suffix(".yaml").map(ProfileName::from)
        })
        .collect();
    names.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(names)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load a profile from `<home>/.treesync/<profile>.yaml`.
///
/// Returns `CoreError::ProfileNotFound` if absent, `CoreError::Parse` if
/// malformed YAML.
pub fn load_at(home: &Path, profile: &ProfileName) -> Result<SyncConfig, CoreError> {
    let path = profile_path_at(home, profile);
    if !path.exists() {
        return Err(CoreError::ProfileNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::Parse { path, source: e })
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save a profile.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// The file may hold an FTP password, hence the restrictive modes.
pub fn save_at(home: &Path, profile: &ProfileName, config: &SyncConfig) -> Result<(), CoreError> {
    let dir = home.join(".treesync");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = profile_path_at(home, profile);
    let tmp_path = path.with_file_name(format!("{}.yaml.tmp", profile.0));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(profile: &ProfileName, config: &SyncConfig) -> Result<(), CoreError> {
    save_at(&home()?, profile, config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn profile() -> ProfileName {
        ProfileName::from("site")
    }

    #[test]
    fn profile_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        let path = profile_path_at(home.path(), &profile());
        assert!(path.ends_with(".treesync/site.yaml"));
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let yaml = "target:\n  kind: ftp\n  server: ftp.example.org\n  username: deploy\n";
        let config: SyncConfig = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(config.local_dir, PathBuf::from("./"));
        assert_eq!(config.server_dir, "./");
        assert_eq!(config.manifest_name, MANIFEST_NAME);
        assert!(config.exclude.is_empty());
        match config.target {
            Target::Ftp { port, password, .. } => {
                assert_eq!(port, DEFAULT_FTP_PORT);
                assert!(password.is_none());
            }
            other => panic!("unexpected target {other:?}"),
        }
    }

    #[test]
    fn target_display_hides_password() {
        let target = Target::Ftp {
            server: "h".into(),
            port: 2121,
            username: "u".into(),
            password: Some("secret".into()),
        };
        assert_eq!(target.to_string(), "ftp://u@h:2121");
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(CoreError::HomeNotFound.to_string().contains("home directory"));
    }
}
