use std::fs;

use feed_core::Item;
use feed_engine::{ensure_store_dir, FileItemStore, ItemStore, MemoryItemStore, ITEMS_FILENAME};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn creates_missing_store_dir() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data").join("feed");
    assert!(!dir.exists());
    ensure_store_dir(&dir).unwrap();
    assert!(dir.is_dir());
}

#[test]
fn store_dir_must_be_a_directory() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();
    assert!(ensure_store_dir(&file_path).is_err());
}

#[tokio::test]
async fn memory_store_assigns_sequential_ids() {
    let store = MemoryItemStore::new();
    store.save(Item::new("a", "one", 1)).await.unwrap();
    store.save(Item::new("b", "two", 2)).await.unwrap();
    let ids: Vec<_> = store
        .list_all()
        .await
        .unwrap()
        .iter()
        .map(|stored| stored.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn file_store_persists_across_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let store = FileItemStore::open(temp.path()).await.unwrap();
        store.save(Item::new("gopher", "first", 3)).await.unwrap();
        store.save(Item::new("ferris", "second", 5)).await.unwrap();
    }

    let reopened = FileItemStore::open(temp.path()).await.unwrap();
    reopened.save(Item::new("gopher", "third", 1)).await.unwrap();

    let stored = reopened.list_all().await.unwrap();
    let summary: Vec<_> = stored
        .iter()
        .map(|s| (s.id, s.item.title.as_str()))
        .collect();
    assert_eq!(summary, vec![(1, "first"), (2, "second"), (3, "third")]);
}

#[tokio::test]
async fn file_store_skips_torn_lines() {
    let temp = TempDir::new().unwrap();
    let store = FileItemStore::open(temp.path()).await.unwrap();
    store.save(Item::new("a", "kept", 1)).await.unwrap();

    let path = temp.path().join(ITEMS_FILENAME);
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("{\"id\":2,\"author\":");
    fs::write(&path, content).unwrap();

    let stored = store.list_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].item, Item::new("a", "kept", 1));
}

#[tokio::test]
async fn empty_file_store_lists_nothing() {
    let temp = TempDir::new().unwrap();
    let store = FileItemStore::open(temp.path().join("fresh")).await.unwrap();
    assert!(store.list_all().await.unwrap().is_empty());
    assert_eq!(store.path(), temp.path().join("fresh").join(ITEMS_FILENAME));
}

#[tokio::test]
async fn reopen_cuts_torn_tail_so_next_save_is_listed() {
    let temp = TempDir::new().unwrap();
    {
        let store = FileItemStore::open(temp.path()).await.unwrap();
        store.save(Item::new("a", "kept", 1)).await.unwrap();
    }

    let path = temp.path().join(ITEMS_FILENAME);
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("{\"id\":2,\"author\":");
    fs::write(&path, content).unwrap();

    let reopened = FileItemStore::open(temp.path()).await.unwrap();
    assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    reopened
        .save(Item::new("b", "after-restart", 2))
        .await
        .unwrap();

    let summary: Vec<_> = reopened
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.id, s.item.title))
        .collect();
    assert_eq!(
        summary,
        vec![(1, "kept".to_string()), (2, "after-restart".to_string())]
    );
}
