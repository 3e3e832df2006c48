//! Entry model for directory-tree snapshots.
//!
//! A tree is a [`DirectoryContent`] map from child name to [`Entry`]. Every
//! entry is an immutable snapshot: the reconciliation stages build new trees
//! from old ones by copy-with-override and never mutate a tree in place.
//!
//! The serde representation is the manifest wire format:
//!
//! ```text
//! {"name": "a.txt", "type": "file", "size": 10, "sha256": "…"}
//! {"name": "docs", "type": "dir", "modified": "20240101120000", "content": {…}}
//! ```
//!
//! Absent optional fields are omitted, `changed` is omitted while unset.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Children of a directory, keyed by entry name.
///
/// A `BTreeMap` keeps iteration (and therefore plans and encoded manifests)
/// deterministic.
pub type DirectoryContent = BTreeMap<String, Entry>;

// ---------------------------------------------------------------------------
// Change markers
// ---------------------------------------------------------------------------

/// A classification result or a plan action attached to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCode {
    /// Observed remotely but unknown to the manifest.
    Added,
    /// Timestamp, size or hash differs from the baseline.
    Modified,
    /// The baseline entry was a file, the observed one is not.
    WasFile,
    /// The baseline entry was a directory, the observed one is not.
    WasDir,
    /// Plan action: create or upload.
    Add,
    /// Plan action: delete.
    Remove,
}

impl fmt::Display for ChangeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeCode::Added => write!(f, "added"),
            ChangeCode::Modified => write!(f, "modified"),
            ChangeCode::WasFile => write!(f, "was_file"),
            ChangeCode::WasDir => write!(f, "was_dir"),
            ChangeCode::Add => write!(f, "add"),
            ChangeCode::Remove => write!(f, "remove"),
        }
    }
}

/// Tri-state change marker.
///
/// `Unset` (never classified) is distinct from `Unchanged` (classified, no
/// difference found).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Change {
    #[default]
    Unset,
    Unchanged,
    Changed(ChangeCode),
}

impl Change {
    pub fn is_unset(&self) -> bool {
        matches!(self, Change::Unset)
    }

    /// `true` only when a change code is attached.
    pub fn is_changed(&self) -> bool {
        matches!(self, Change::Changed(_))
    }

    pub fn code(&self) -> Option<ChangeCode> {
        match self {
            Change::Changed(code) => Some(*code),
            Change::Unset | Change::Unchanged => None,
        }
    }
}

impl From<Option<ChangeCode>> for Change {
    fn from(code: Option<ChangeCode>) -> Self {
        match code {
            Some(code) => Change::Changed(code),
            None => Change::Unchanged,
        }
    }
}

impl From<ChangeCode> for Change {
    fn from(code: ChangeCode) -> Self {
        Change::Changed(code)
    }
}

impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Change::Unset => serializer.serialize_none(),
            Change::Unchanged => serializer.serialize_bool(false),
            Change::Changed(code) => code.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChangeRepr {
    Flag(bool),
    Code(ChangeCode),
}

impl<'de> Deserialize<'de> for Change {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<ChangeRepr>::deserialize(deserializer)? {
            None => Ok(Change::Unset),
            Some(ChangeRepr::Flag(false)) => Ok(Change::Unchanged),
            Some(ChangeRepr::Flag(true)) => Err(D::Error::custom(
                "`changed` must be false or a change code, not true",
            )),
            Some(ChangeRepr::Code(code)) => Ok(Change::Changed(code)),
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// The two kinds of tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Dir => write!(f, "dir"),
        }
    }
}

/// File-specific fields. Which ones are present depends on the source: a
/// local scan has both, a remote listing only `size`, a manifest `sha256`
/// and usually `size`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Directory-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectoryEntry {
    #[serde(
        default,
        serialize_with = "serialize_content",
        deserialize_with = "deserialize_content"
    )]
    pub content: DirectoryContent,
}

// Trees can nest hundreds of levels; each level gets fresh stack if needed.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

fn serialize_content<S: Serializer>(content: &DirectoryContent, s: S) -> Result<S::Ok, S::Error> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || content.serialize(s))
}

fn deserialize_content<'de, D: Deserializer<'de>>(d: D) -> Result<DirectoryContent, D::Error> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || DirectoryContent::deserialize(d))
}

/// Variant payload of an [`Entry`], tagged `"type"` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    #[serde(rename = "file")]
    File(FileEntry),
    #[serde(rename = "dir")]
    Dir(DirectoryEntry),
}

/// A snapshot of one named file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Change::is_unset")]
    pub changed: Change,
    /// Protocol-reported modification time, opaque string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    #[serde(flatten)]
    pub node: Node,
}

impl Entry {
    pub fn file(name: impl Into<String>, size: Option<u64>, sha256: Option<String>) -> Self {
        Self {
            name: name.into(),
            changed: Change::Unset,
            modified: None,
            node: Node::File(FileEntry { size, sha256 }),
        }
    }

    pub fn dir(name: impl Into<String>, content: DirectoryContent) -> Self {
        Self {
            name: name.into(),
            changed: Change::Unset,
            modified: None,
            node: Node::Dir(DirectoryEntry { content }),
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self.node {
            Node::File(_) => EntryKind::File,
            Node::Dir(_) => EntryKind::Dir,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.node, Node::Dir(_))
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match &self.node {
            Node::File(file) => Some(file),
            Node::Dir(_) => None,
        }
    }

    /// Children of a directory entry; `None` for files.
    pub fn content(&self) -> Option<&DirectoryContent> {
        match &self.node {
            Node::Dir(dir) => Some(&dir.content),
            Node::File(_) => None,
        }
    }

    pub fn with_changed(mut self, changed: impl Into<Change>) -> Self {
        self.changed = changed.into();
        self
    }

    pub fn with_modified(mut self, modified: Option<String>) -> Self {
        self.modified = modified;
        self
    }

    /// Copy of this entry's own fields with `content` as its children.
    ///
    /// Children of `self` are not cloned. Files are copied as they are;
    /// `content` must then be empty.
    pub fn with_content(&self, content: DirectoryContent) -> Self {
        let node = match &self.node {
            Node::Dir(_) => Node::Dir(DirectoryEntry { content }),
            Node::File(file) => {
                debug_assert!(content.is_empty(), "file '{}' given children", self.name);
                Node::File(file.clone())
            }
        };
        Self {
            name: self.name.clone(),
            changed: self.changed,
            modified: self.modified.clone(),
            node,
        }
    }

    /// Classify `self` (newly observed) against `expected` (baseline).
    ///
    /// Rules in order, first match wins:
    /// 1. kinds differ → `WasFile` / `WasDir`, naming what `expected` was;
    /// 2. both `modified` present and different → `Modified`;
    /// 3. both file `size` present and different → `Modified`;
    /// 4. both file `sha256` present and different → `Modified`.
    ///
    /// A field missing on either side is no evidence of change.
    pub fn changed_from(&self, expected: &Entry) -> Option<ChangeCode> {
        if self.kind() != expected.kind() {
            return Some(match expected.kind() {
                EntryKind::File => ChangeCode::WasFile,
                EntryKind::Dir => ChangeCode::WasDir,
            });
        }
        if differs(&self.modified, &expected.modified) {
            return Some(ChangeCode::Modified);
        }
        if let (Node::File(own), Node::File(other)) = (&self.node, &expected.node) {
            if differs(&own.size, &other.size) || differs(&own.sha256, &other.sha256) {
                return Some(ChangeCode::Modified);
            }
        }
        None
    }
}

fn differs<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a != b)
}

/// Check that every entry is stored under its own, non-empty name.
pub fn validate_tree(content: &DirectoryContent) -> Result<(), CoreError> {
    validate_at(content, "")
}

fn validate_at(content: &DirectoryContent, parent: &str) -> Result<(), CoreError> {
    for (key, entry) in content {
        if entry.name.is_empty() {
            return Err(CoreError::EmptyName {
                parent: display_parent(parent),
            });
        }
        if *key != entry.name {
            return Err(CoreError::NameMismatch {
                parent: display_parent(parent),
                key: key.clone(),
                name: entry.name.clone(),
            });
        }
        if let Some(children) = entry.content() {
            validate_at(children, &format!("{parent}/{key}"))?;
        }
    }
    Ok(())
}

fn display_parent(parent: &str) -> String {
    if parent.is_empty() {
        "/".to_string()
    } else {
        parent.to_string()
    }
}

/// Build a [`DirectoryContent`] keyed by each entry's own name.
pub fn content_of(entries: impl IntoIterator<Item = Entry>) -> DirectoryContent {
    entries
        .into_iter()
        .map(|entry| (entry.name.clone(), entry))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
