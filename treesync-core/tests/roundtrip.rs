//! Roundtrip tests for the manifest wire format.
//!
//! Each `#[case]` is isolated — no shared state.

use chrono::Utc;
use rstest::rstest;
use treesync_core::{
    content_of,
    manifest::{self, Manifest},
    DirectoryContent, Entry, EntryKind,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn empty_tree() -> DirectoryContent {
    DirectoryContent::new()
}

fn full_tree() -> DirectoryContent {
    content_of([
        Entry::file("index.html", Some(512), Some("0f".repeat(32)))
            .with_modified(Some("20240501100000".into())),
        Entry::dir(
            "assets",
            content_of([
                Entry::file("app.css", Some(77), Some("aa".repeat(32))),
                Entry::dir("img", content_of([Entry::file("logo.png", Some(9000), None)])),
            ]),
        )
        .with_modified(Some("20240501100001".into())),
        Entry::dir("empty", DirectoryContent::new()),
    ])
}

fn unicode_tree() -> DirectoryContent {
    content_of([
        Entry::file("アプリ-проект-项目.txt", Some(1), None),
        Entry::dir(
            "spéçïal & <chars>",
            content_of([Entry::file("\"quoted\" 🚀", None, Some("ff".into()))]),
        ),
    ])
}

fn deep_tree(depth: usize) -> DirectoryContent {
    let mut tree = content_of([Entry::file("leaf", Some(0), None)]);
    for level in 0..depth {
        tree = content_of([Entry::dir(format!("d{level}"), tree)]);
    }
    tree
}

// ---------------------------------------------------------------------------
// Parameterised roundtrip test
// ---------------------------------------------------------------------------

#[rstest]
#[case("empty", empty_tree())]
#[case("all_fields", full_tree())]
#[case("unicode_names", unicode_tree())]
#[case("nested", deep_tree(40))]
#[case("deeply_nested", deep_tree(300))]
#[case("root_named_type", content_of([Entry::file("type", Some(1), Some("0a".into()))]))]
fn manifest_roundtrip(#[case] label: &str, #[case] files: DirectoryContent) {
    let original = Manifest::new(files, Utc::now());
    let bytes = manifest::encode(&original)
        .unwrap_or_else(|e| panic!("[{label}] encode failed: {e}"));
    let back = manifest::decode(&bytes).unwrap_or_else(|e| panic!("[{label}] decode failed: {e}"));
    assert_eq!(original.synced_at, back.synced_at, "[{label}] synced_at");
    assert_eq!(original.files, back.files, "[{label}] tree");
}

#[rstest]
#[case(EntryKind::File)]
#[case(EntryKind::Dir)]
fn kind_survives_roundtrip(#[case] kind: EntryKind) {
    let entry = match kind {
        EntryKind::File => Entry::file("x", None, None),
        EntryKind::Dir => Entry::dir("x", DirectoryContent::new()),
    };
    let json = serde_json::to_string(&entry).expect("serialize");
    assert!(json.contains(&format!("\"type\":\"{kind}\"")), "{json}");
    let back: Entry = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.kind(), kind);
}
