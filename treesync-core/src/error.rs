//! Error types for treesync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from the entry model, manifest codec and
/// profile configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (profile save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes the profile path.
    #[error("failed to parse profile at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The manifest document is not valid JSON or does not describe a tree.
    #[error("manifest decode error: {0}")]
    ManifestDecode(#[source] serde_json::Error),

    /// Manifest encoding failed.
    #[error("manifest encode error: {0}")]
    ManifestEncode(#[source] serde_json::Error),

    /// An entry is stored under a key that differs from its own name.
    #[error("entry '{name}' stored under key '{key}' at '{parent}'")]
    NameMismatch {
        parent: String,
        key: String,
        name: String,
    },

    /// An entry has an empty name.
    #[error("entry with empty name at '{parent}'")]
    EmptyName { parent: String },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.treesync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The profile YAML file did not exist at the expected path.
    #[error("profile not found at {path}")]
    ProfileNotFound { path: PathBuf },
}
