//! Integration Tests
//!
//! End-to-end behaviour of pages, history, the registry and the file format.

use pretty_assertions::assert_eq;

use storyboard_engine::state::{
    PageCollection, PageId, PagePatch, Storyboard, StoryboardRegistry, VersionedStore,
};
use storyboard_engine::transfer::{self, StoryboardFile};
use storyboard_engine::StoryboardError;

fn collection(n: usize) -> PageCollection {
    (0..n).fold(PageCollection::new(), |c, _| c.insert_page())
}

fn ids(pages: &PageCollection) -> Vec<PageId> {
    pages.iter().map(|p| p.id()).collect()
}

fn numbers(pages: &PageCollection) -> Vec<usize> {
    pages.iter().map(|p| p.page_number()).collect()
}

// === Page Collection Properties ===

#[test]
fn test_insert_then_delete_is_identity() {
    for n in 0..6 {
        let original = collection(n);
        let grown = original.insert_page();
        assert!(grown.is_densely_numbered());

        let shrunk = grown.delete_page(grown.len() - 1).unwrap();
        assert_eq!(shrunk, original);
        assert!(shrunk.is_densely_numbered());
    }
}

#[test]
fn test_reorder_is_permutation() {
    let original = collection(5);
    for source in 0..5 {
        for target in 0..5 {
            let moved = original.reorder_pages(source, target).unwrap();

            let mut before = ids(&original);
            let mut after = ids(&moved);
            before.sort_unstable();
            after.sort_unstable();
            assert_eq!(before, after);
            assert_eq!(numbers(&moved), vec![1, 2, 3, 4, 5]);
            assert_eq!(moved.get(target).unwrap().id(), original.get(source).unwrap().id());
        }
    }
}

#[test]
fn test_insert_then_move_to_front() {
    let one = collection(1);
    let two = one.insert_page();
    assert_eq!(ids(&two), vec![1, 2]);
    assert_eq!(numbers(&two), vec![1, 2]);

    let moved = two.reorder_pages(1, 0).unwrap();
    assert_eq!(ids(&moved), vec![2, 1]);
    assert_eq!(numbers(&moved), vec![1, 2]);
}

#[test]
fn test_ids_survive_edits_and_deletes() {
    let pages = collection(3)
        .update_page(1, &PagePatch::new().dialogue("kept"))
        .unwrap()
        .delete_page(0)
        .unwrap();

    assert_eq!(ids(&pages), vec![2, 3]);
    assert_eq!(pages.get(0).unwrap().dialogue, "kept");
    assert_eq!(pages.insert_page().get(2).unwrap().id(), 4);
}

#[test]
fn test_add_page_after_importing_largest_id() {
    let json = r#"{"name":"A","pages":[{"id":18446744073709551615}]}"#;
    let (name, pages) = StoryboardFile::parse(json).unwrap().into_collection();

    let mut sb = Storyboard::with_pages(name, pages);
    let index = sb.add_page();

    assert_eq!(index, 1);
    assert_eq!(ids(sb.pages()), vec![u64::MAX, 1]);
    assert!(sb.pages().is_densely_numbered());
}

// === History Properties ===

#[test]
fn test_undo_k_then_redo_k_restores_present() {
    let mut store = VersionedStore::new(collection(0));
    for _ in 0..5 {
        let next = store.present().insert_page();
        store.commit(next);
    }
    let present = store.present().clone();

    for k in 0..=5 {
        for _ in 0..k {
            assert!(store.undo());
        }
        for _ in 0..k {
            assert!(store.redo());
        }
        assert_eq!(store.present(), &present);
    }
}

#[test]
fn test_commit_after_undo_discards_future() {
    let mut store = VersionedStore::new(collection(0));
    for _ in 0..3 {
        let next = store.present().insert_page();
        store.commit(next);
    }
    store.undo();
    store.undo();
    assert_eq!(store.redo_count(), 2);

    let branch = store
        .present()
        .update_page(0, &PagePatch::new().page_name("branch"))
        .unwrap();
    store.commit(branch);

    assert_eq!(store.redo_count(), 0);
    assert!(!store.redo());
}

#[test]
fn test_undo_on_empty_history_is_noop() {
    let mut store = VersionedStore::new(collection(2));
    let before = store.frame().clone();

    assert!(!store.undo());
    assert_eq!(store.frame(), &before);
}

// === Storyboard Editing ===

#[test]
fn test_storyboard_edit_session() {
    let mut sb = Storyboard::new("Pilot");
    sb.add_page();
    sb.add_page();
    sb.update_page(0, &PagePatch::new().dialogue("Hello")).unwrap();
    sb.reorder_pages(0, 1).unwrap();

    assert_eq!(sb.pages().get(1).unwrap().dialogue, "Hello");
    assert_eq!(sb.history().undo_count(), 4);

    assert!(sb.undo());
    assert_eq!(sb.pages().get(0).unwrap().dialogue, "Hello");

    sb.delete_page(1).unwrap();
    assert!(!sb.can_redo());
}

#[test]
fn test_failed_edit_adds_no_history() {
    let mut sb = Storyboard::new("Pilot");
    sb.add_page();

    let err = sb.delete_page(3).unwrap_err();
    assert!(matches!(err, StoryboardError::IndexOutOfRange { index: 3, len: 1 }));
    assert_eq!(sb.history().undo_count(), 1);
}

// === Registry ===

#[test]
fn test_close_active_middle_tab_focuses_previous() {
    let mut registry = StoryboardRegistry::new();
    registry.open_new("A");
    registry.open_new("B");
    registry.open_new("C");
    registry.set_active(1).unwrap();

    let closed = registry.close(1).unwrap();
    assert_eq!(closed.name(), "B");
    assert_eq!(registry.active_index(), Some(0));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_edits_are_isolated_per_storyboard() {
    let mut registry = StoryboardRegistry::new();
    registry.open_new("A");
    registry.open_new("B");

    registry.add_page(0).unwrap();
    registry.add_page(0).unwrap();
    registry.add_page(1).unwrap();
    registry.undo(1).unwrap();

    assert_eq!(registry.get(0).unwrap().pages().len(), 2);
    assert_eq!(registry.get(1).unwrap().pages().len(), 0);
    assert_eq!(registry.get(0).unwrap().history().redo_count(), 0);
}

#[test]
fn test_invalid_import_leaves_registry_unchanged() {
    let mut registry = StoryboardRegistry::new();
    registry.open_new("A");

    let err = StoryboardFile::parse(r#"{"name":"A"}"#).unwrap_err();
    assert!(matches!(err, StoryboardError::InvalidStoryboardFile { .. }));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.active_index(), Some(0));
}

// === File Format ===

#[test]
fn test_export_import_round_trip() {
    let mut sb = Storyboard::new("Episode 1");
    sb.add_page();
    sb.add_page();
    sb.update_page(
        0,
        &PagePatch::new()
            .page_name("Cold open")
            .dialogue("Where were you?")
            .context("Night, rain")
            .timestamp("3.5")
            .image("data:image/png;base64,iVBORw0KGgo="),
    )
    .unwrap();
    sb.reorder_pages(1, 0).unwrap();

    let json = transfer::export(&sb).unwrap();
    let (name, pages) = StoryboardFile::parse(&json).unwrap().into_collection();

    assert_eq!(name, "Episode 1");
    assert_eq!(&pages, sb.pages());
}

#[test]
fn test_export_uses_camel_case_keys() {
    let mut sb = Storyboard::new("Keys");
    sb.add_page();

    let json = transfer::export(&sb).unwrap();
    assert!(json.contains("\"pageNumber\": 1"));
    assert!(json.contains("\"pageName\""));
}

#[test]
fn test_import_renumbers_pages() {
    let json = r#"{
        "name": "Loose",
        "pages": [
            {"id": 7, "pageNumber": 4, "dialogue": "first"},
            {"id": 3, "pageNumber": 9}
        ]
    }"#;

    let (_, pages) = StoryboardFile::parse(json).unwrap().into_collection();
    assert_eq!(ids(&pages), vec![7, 3]);
    assert_eq!(numbers(&pages), vec![1, 2]);
    assert_eq!(pages.insert_page().get(2).unwrap().id(), 8);
}
