//! treesync core library — entry model, manifest codec, profiles, errors.
//!
//! Public API surface:
//! - [`types`] — [`Entry`] trees and the change classifier
//! - [`manifest`] — JSON manifest encode / decode
//! - [`config`] — YAML sync profiles
//! - [`error`] — [`CoreError`]

pub mod config;
pub mod error;
pub mod manifest;
pub mod types;

pub use config::{ProfileName, SyncConfig, Target};
pub use error::CoreError;
pub use manifest::{Manifest, MANIFEST_NAME};
pub use types::{
    content_of, validate_tree, Change, ChangeCode, DirectoryContent, DirectoryEntry, Entry,
    EntryKind, FileEntry, Node,
};
