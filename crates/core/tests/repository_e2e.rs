//! End-to-end tests for the settings repository.
//!
//! These tests exercise the public API with:
//! - A real store root in a temporary directory
//! - A real git index (`GitIndex`) in that root
//! - Conflict resolution through `StoreRevisionSource`, with incoming
//!   revisions staged in a sibling directory
//!
//! No network I/O and no operator: interactive runs use a scripted presenter.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use settingsrepo_core::conflict::{
    ConflictResolver, MergePresenter, MergeRequest, PresentationOutcome, PreferSide,
    SentinelStrategy, Side, StoreRevisionSource, UiExecutor, VirtualContent,
};
use settingsrepo_core::errors::ConflictError;
use settingsrepo_core::{GitIndex, PathStore, RepositoryManager};

// ===========================================================================
// Helpers
// ===========================================================================

struct Fixture {
    _dir: TempDir,
    manager: RepositoryManager<GitIndex>,
    incoming: PathStore,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("repository");
    let index = GitIndex::open_or_init(&root).unwrap();
    let manager = RepositoryManager::new(&root, index);
    let incoming = PathStore::new(dir.path().join("incoming"));
    Fixture {
        _dir: dir,
        manager,
        incoming,
    }
}

fn paths(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

fn indexed(manager: &RepositoryManager<GitIndex>, path: &str) -> Option<Vec<u8>> {
    manager.with_index(|index| index.staged_content(path).unwrap())
}

// ===========================================================================
// Storage + index pairing
// ===========================================================================

#[test]
fn test_write_read_delete_keeps_git_index_paired() {
    let f = fixture();

    f.manager.write("options/editor.xml", b"<editor font=\"12\"/>", 19);
    f.manager.write("keymaps/mine.xml", b"<keymap/>", 9);

    assert_eq!(
        f.manager.read("options/editor.xml").unwrap().as_deref(),
        Some(&b"<editor font=\"12\"/>"[..])
    );
    assert_eq!(
        indexed(&f.manager, "options/editor.xml").as_deref(),
        Some(&b"<editor font=\"12\"/>"[..])
    );

    f.manager.delete("options/editor.xml");
    assert!(!f.manager.exists("options/editor.xml"));
    assert!(!f.manager.exists("options"));
    assert_eq!(indexed(&f.manager, "options/editor.xml"), None);
    assert_eq!(indexed(&f.manager, "keymaps/mine.xml").as_deref(), Some(&b"<keymap/>"[..]));

    // Deleting again is quiet and leaves the index alone.
    f.manager.delete("options/editor.xml");
    assert_eq!(
        f.manager.with_index(|index| index.entries().unwrap()),
        vec!["keymaps/mine.xml".to_string()]
    );
}

#[test]
fn test_list_children_hides_git_dir() {
    let f = fixture();
    f.manager.write("options/a.xml", b"a", 1);
    f.manager.write("options/b.xml", b"b", 1);

    assert_eq!(f.manager.list_children("options").unwrap(), vec!["a.xml", "b.xml"]);
    assert_eq!(f.manager.list_children("").unwrap(), vec!["options"]);
    assert!(f.manager.root().join(".git").is_dir());
}

#[test]
fn test_git_metadata_is_not_reachable_through_manager() {
    let f = fixture();
    f.manager.write("a.xml", b"a", 1);

    f.manager.write(".git/HEAD", b"garbage", 7);
    f.manager.write("b.xml", b"b", 1);
    f.manager.delete(".git");
    f.manager.delete("sub/.git");
    f.manager.write("c.xml", b"c", 1);

    let head = std::fs::read(f.manager.root().join(".git/HEAD")).unwrap();
    assert_ne!(head, b"garbage");
    assert!(!f.manager.exists(".git"));

    let expected = vec!["a.xml".to_string(), "b.xml".to_string(), "c.xml".to_string()];
    assert_eq!(f.manager.with_index(|index| index.entries().unwrap()), expected);

    // Reopening sees the same index the manager maintained.
    let reopened = GitIndex::open_or_init(f.manager.root()).unwrap();
    assert_eq!(reopened.entries().unwrap(), expected);
}

#[test]
fn test_concurrent_writers_to_distinct_paths() {
    let f = fixture();

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let manager = &f.manager;
            scope.spawn(move || {
                for i in 0..10 {
                    let path = format!("w{worker}/f{i}.xml");
                    let body = format!("<v w=\"{worker}\" i=\"{i}\"/>");
                    manager.write(&path, body.as_bytes(), body.len());
                }
            });
        }
    });

    let entries = f.manager.with_index(|index| index.entries().unwrap());
    assert_eq!(entries.len(), 40);
    for worker in 0..4 {
        for i in 0..10 {
            let path = format!("w{worker}/f{i}.xml");
            let body = format!("<v w=\"{worker}\" i=\"{i}\"/>").into_bytes();
            assert_eq!(f.manager.read(&path).unwrap(), Some(body.clone()));
            assert_eq!(indexed(&f.manager, &path), Some(body));
        }
    }
}

// ===========================================================================
// Conflict resolution
// ===========================================================================

#[test]
fn test_automated_sentinel_resolution_through_store() {
    let f = fixture();
    f.manager.write("a.xml", b"reset to my", 11);
    f.manager.write("b.xml", b"Y", 1);
    f.manager.write("c.xml", b"local", 5);
    f.incoming.write("a.xml", b"X", 1).unwrap();
    f.incoming.write("b.xml", b"reset to my", 11).unwrap();
    f.incoming.write("c.xml", b"remote", 6).unwrap();

    let source = StoreRevisionSource::new(&f.manager, f.incoming.clone());
    let resolver = ConflictResolver::automated(SentinelStrategy::default());
    let resolved = resolver
        .resolve(&source.pending().unwrap(), &source)
        .unwrap();

    assert_eq!(
        resolved,
        BTreeSet::from(["a.xml".to_string(), "b.xml".to_string()])
    );
    assert_eq!(f.manager.read("a.xml").unwrap().as_deref(), Some(&b"reset to my"[..]));
    assert_eq!(f.manager.read("b.xml").unwrap().as_deref(), Some(&b"reset to my"[..]));
    assert_eq!(indexed(&f.manager, "b.xml").as_deref(), Some(&b"reset to my"[..]));

    // The unresolved path keeps both sides.
    assert_eq!(f.manager.read("c.xml").unwrap().as_deref(), Some(&b"local"[..]));
    assert_eq!(source.pending().unwrap(), vec!["c.xml"]);
}

#[test]
fn test_take_incoming_applies_remote_deletion() {
    let f = fixture();
    f.manager.write("obsolete/old.xml", b"old", 3);
    // Nothing staged remotely for the path: incoming side is absent.
    let source = StoreRevisionSource::new(&f.manager, f.incoming.clone());
    let resolver = ConflictResolver::automated(PreferSide(Side::Incoming));

    let resolved = resolver
        .resolve(&paths(&["obsolete/old.xml"]), &source)
        .unwrap();

    assert!(resolved.contains("obsolete/old.xml"));
    assert!(!f.manager.exists("obsolete"));
    assert_eq!(indexed(&f.manager, "obsolete/old.xml"), None);
}

/// Picks the incoming side for every request whose incoming text starts with
/// `accept`, then cancels whatever remains.
struct PrefixPresenter;

impl MergePresenter for PrefixPresenter {
    fn present(&self, batch: &[MergeRequest]) -> Result<PresentationOutcome, ConflictError> {
        let mut done = Vec::new();
        for request in batch {
            match request.candidate.incoming_text() {
                Some(text) if text.starts_with("accept") => {
                    request
                        .result
                        .set_binary_content(text.as_bytes().to_vec(), 1, Utc::now())?;
                    done.push(request.path.clone());
                }
                _ => return Ok(PresentationOutcome::cancelled(done)),
            }
        }
        Ok(PresentationOutcome::completed(done))
    }
}

#[test]
fn test_interactive_cancel_leaves_rest_conflicted() {
    let f = fixture();
    f.manager.write("a.xml", b"local a", 7);
    f.manager.write("b.xml", b"local b", 7);
    f.incoming.write("a.xml", b"accept a", 8).unwrap();
    f.incoming.write("b.xml", b"reject b", 8).unwrap();

    let source = StoreRevisionSource::new(&f.manager, f.incoming.clone());
    let executor = Arc::new(UiExecutor::spawn("settings-merge").unwrap());
    let resolver = ConflictResolver::interactive(Arc::new(PrefixPresenter), executor);

    let resolved = resolver
        .resolve(&paths(&["a.xml", "b.xml"]), &source)
        .unwrap();

    assert_eq!(resolved, BTreeSet::from(["a.xml".to_string()]));
    assert_eq!(f.manager.read("a.xml").unwrap().as_deref(), Some(&b"accept a"[..]));
    assert_eq!(f.manager.read("b.xml").unwrap().as_deref(), Some(&b"local b"[..]));
    assert_eq!(source.pending().unwrap(), vec!["b.xml"]);
}
