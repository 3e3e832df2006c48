//! Error types for treesync-sync.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use treesync_core::CoreError;

/// All errors that can arise from scanning, remote sessions and plan execution.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the entry model or manifest codec.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A local I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A remote operation failed. `path` is the remote working directory
    /// joined with the operand.
    #[error("remote {op} failed at '{path}': {message}")]
    Remote {
        op: &'static str,
        path: String,
        message: String,
    },

    /// A path component that must be a directory is something else.
    #[error("'{path}' is not a directory")]
    NotADirectory { path: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::Remote`].
pub(crate) fn remote_err(op: &'static str, path: impl Into<String>, err: impl fmt::Display) -> SyncError {
    SyncError::Remote {
        op,
        path: path.into(),
        message: err.to_string(),
    }
}
