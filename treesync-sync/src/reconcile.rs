//! Three-way tree reconciliation.
//!
//! Inputs per run:
//! - the desired local tree (sizes + hashes, no timestamps),
//! - the freshly listed remote tree (sizes + timestamps, no hashes),
//! - the manifest persisted by the previous run (hashes + timestamps).
//!
//! [`merge_entries`] overlays the manifest onto the remote listing,
//! [`create_update_list`] diffs the desired tree against that overlay, and
//! [`merge_modified`] builds the next manifest once the plan has been applied.
//!
//! Every function here is pure: inputs are borrowed, outputs are new trees.

use serde::Serialize;

use treesync_core::{Change, ChangeCode, DirectoryContent, Entry, EntryKind, FileEntry, Node};

/// Remove and add trees that converge the remote onto the desired tree.
///
/// Nodes tagged [`ChangeCode::Remove`] / [`ChangeCode::Add`] are acted on as
/// a whole; directory nodes marked [`Change::Unchanged`] are wrappers that
/// only lead to tagged descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub to_remove: DirectoryContent,
    pub to_add: DirectoryContent,
}

/// One tagged node of a [`Plan`], flattened for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanItem {
    /// `/`-separated path relative to the server directory.
    pub path: String,
    pub kind: EntryKind,
    pub code: ChangeCode,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    /// Tagged nodes of the remove tree, parents before children.
    pub fn removals(&self) -> Vec<PlanItem> {
        let mut items = Vec::new();
        flatten_into(&self.to_remove, "", &mut items);
        items
    }

    /// Tagged nodes of the add tree, parents before children.
    pub fn additions(&self) -> Vec<PlanItem> {
        let mut items = Vec::new();
        flatten_into(&self.to_add, "", &mut items);
        items
    }
}

fn flatten_into(tree: &DirectoryContent, prefix: &str, items: &mut Vec<PlanItem>) {
    for (name, entry) in tree {
        let path = join_path(prefix, name);
        if let Some(code) = entry.changed.code() {
            items.push(PlanItem {
                path: path.clone(),
                kind: entry.kind(),
                code,
            });
        }
        if let Some(children) = entry.content() {
            flatten_into(children, &path, items);
        }
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

// ---------------------------------------------------------------------------
// Trust overlay
// ---------------------------------------------------------------------------

/// Annotate a remote listing with the manifest's trusted hashes.
///
/// The result has exactly the shape of `actual`. Files borrow `sha256` from
/// the matching manifest file; each entry is marked `Added` when the
/// manifest does not know it, otherwise with its classification against the
/// manifest entry. Manifest-only entries are dropped.
pub fn merge_entries(actual: &DirectoryContent, expected: &DirectoryContent) -> DirectoryContent {
    actual
        .iter()
        .map(|(name, entry)| {
            debug_assert_eq!(name, &entry.name, "entry filed under the wrong key");
            (name.clone(), overlay_entry(entry, expected.get(name)))
        })
        .collect()
}

fn overlay_entry(entry: &Entry, trusted: Option<&Entry>) -> Entry {
    let mut copy = match (&entry.node, trusted.map(|t| &t.node)) {
        (Node::Dir(dir), _) => {
            let empty = DirectoryContent::new();
            let trusted_children = trusted.and_then(Entry::content).unwrap_or(&empty);
            entry.with_content(merge_entries(&dir.content, trusted_children))
        }
        (Node::File(file), Some(Node::File(trusted_file))) => Entry {
            node: Node::File(FileEntry {
                size: file.size,
                sha256: trusted_file.sha256.clone(),
            }),
            ..entry.clone()
        },
        (Node::File(_), _) => entry.clone(),
    };
    copy.changed = match trusted {
        None => Change::Changed(ChangeCode::Added),
        Some(trusted) => copy.changed_from(trusted).into(),
    };
    copy
}

// ---------------------------------------------------------------------------
// Plan builder
// ---------------------------------------------------------------------------

/// Diff the desired tree against an annotated remote tree.
///
/// A remote entry is replaced wholesale when the desired tree lacks it, when
/// it carries a change code, or when it differs from the desired entry. A
/// desired entry is added wholesale under the same conditions mirrored.
/// Matching directories are diffed recursively and contribute wrapper nodes
/// only when something below them changes.
pub fn create_update_list(wanted: &DirectoryContent, actual: &DirectoryContent) -> Plan {
    let mut plan = Plan::default();

    for (name, current) in actual {
        debug_assert_eq!(name, &current.name, "entry filed under the wrong key");
        let replace = match wanted.get(name) {
            None => true,
            Some(desired) => needs_replacement(desired, current),
        };
        if replace {
            plan.to_remove
                .insert(name.clone(), recursive_change(current, ChangeCode::Remove));
        }
    }

    for (name, desired) in wanted {
        debug_assert_eq!(name, &desired.name, "entry filed under the wrong key");
        match actual.get(name) {
            Some(current) if !needs_replacement(desired, current) => {
                let (Some(want_children), Some(have_children)) =
                    (desired.content(), current.content())
                else {
                    continue;
                };
                let sub = create_update_list(want_children, have_children);
                if !sub.to_remove.is_empty() {
                    plan.to_remove
                        .insert(name.clone(), wrapper(current, sub.to_remove));
                }
                if !sub.to_add.is_empty() {
                    plan.to_add.insert(name.clone(), wrapper(desired, sub.to_add));
                }
            }
            _ => {
                plan.to_add
                    .insert(name.clone(), recursive_change(desired, ChangeCode::Add));
            }
        }
    }

    plan
}

fn needs_replacement(desired: &Entry, current: &Entry) -> bool {
    current.changed.is_changed() || desired.changed_from(current).is_some()
}

fn wrapper(dir: &Entry, children: DirectoryContent) -> Entry {
    dir.with_content(children).with_changed(Change::Unchanged)
}

// ---------------------------------------------------------------------------
// Subtree tagger
// ---------------------------------------------------------------------------

/// Copy `entry` with `changed = code` on it and on every descendant.
pub fn recursive_change(entry: &Entry, code: ChangeCode) -> Entry {
    let copy = match entry.content() {
        Some(children) => entry.with_content(
            children
                .iter()
                .map(|(name, child)| (name.clone(), recursive_change(child, code)))
                .collect(),
        ),
        None => entry.clone(),
    };
    copy.with_changed(code)
}

// ---------------------------------------------------------------------------
// Manifest updater
// ---------------------------------------------------------------------------

/// Copy `file_list`, taking `modified` from same-named entries of
/// `file_dates`.
///
/// Entries without a counterpart keep their own timestamp.
pub fn merge_modified(file_list: &DirectoryContent, file_dates: &DirectoryContent) -> DirectoryContent {
    file_list
        .iter()
        .map(|(name, entry)| {
            let dated = file_dates.get(name);
            let mut copy = match entry.content() {
                Some(children) => {
                    let empty = DirectoryContent::new();
                    let dates = dated.and_then(Entry::content).unwrap_or(&empty);
                    entry.with_content(merge_modified(children, dates))
                }
                None => entry.clone(),
            };
            if let Some(dated) = dated {
                copy.modified = dated.modified.clone();
            }
            (name.clone(), copy)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
