//! Manifest codec — the persisted tree of trusted remote hashes.
//!
//! The manifest is uploaded next to the synced content and read back on the
//! next run. Current documents are structured:
//!
//! ```text
//! {"synced_at": "2024-05-01T10:00:00Z", "files": {"a.txt": {"name": "a.txt", "type": "file", …}}}
//! ```
//!
//! A bare `{name: entry}` map (the format written by earlier releases) is
//! still accepted and decodes with `synced_at: None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{validate_tree, DirectoryContent};

/// Default file name of the manifest inside the server directory.
pub const MANIFEST_NAME: &str = ".treesync-manifest.json";

/// Decoded manifest payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
    pub files: DirectoryContent,
}

impl Manifest {
    pub fn new(files: DirectoryContent, synced_at: DateTime<Utc>) -> Self {
        Self {
            synced_at: Some(synced_at),
            files,
        }
    }
}

/// Serialize a manifest as pretty-printed JSON.
pub fn encode(manifest: &Manifest) -> Result<Vec<u8>, CoreError> {
    validate_tree(&manifest.files)?;
    serde_json::to_vec_pretty(manifest).map_err(CoreError::ManifestEncode)
}

/// Parse and validate a manifest document.
///
/// Fails with [`CoreError::ManifestDecode`] when a required field is missing
/// or has the wrong type, and with [`CoreError::NameMismatch`] /
/// [`CoreError::EmptyName`] when an entry is filed under the wrong key.
/// Nesting depth is bounded only by memory.
pub fn decode(bytes: &[u8]) -> Result<Manifest, CoreError> {
    let value = parse(bytes)?;
    let structured = is_structured(&value);
    let stacked = serde_stacker::Deserializer::new(value);
    let manifest = if structured {
        Manifest::deserialize(stacked)
    } else {
        DirectoryContent::deserialize(stacked).map(|files| Manifest {
            synced_at: None,
            files,
        })
    }
    .map_err(CoreError::ManifestDecode)?;
    validate_tree(&manifest.files)?;
    Ok(manifest)
}

fn parse(bytes: &[u8]) -> Result<Value, CoreError> {
    let mut json = serde_json::Deserializer::from_slice(bytes);
    json.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut json))
        .map_err(CoreError::ManifestDecode)?;
    json.end().map_err(CoreError::ManifestDecode)?;
    Ok(value)
}

/// A structured document has a `files` map of entries. A legacy map may hold
/// an entry called `files` itself; that one names itself `"files"`.
fn is_structured(value: &Value) -> bool {
    match value.get("files") {
        Some(Value::Object(files)) => {
            files.get("name").and_then(Value::as_str) != Some("files")
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
