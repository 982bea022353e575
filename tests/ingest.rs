//! Ingestion Tests
//!
//! Integration tests for folder ingestion over an in-memory store.

mod common;

use std::sync::Arc;

use common::MemoryStore;
use fileshare::{ContentRegistry, Database, FileShareError, IngestReport, Ingestor, NewSharedFile};

async fn setup(store: &MemoryStore, max_depth: usize) -> (Database, ContentRegistry, Ingestor) {
    let db = Database::open_in_memory().await.unwrap();
    let registry = ContentRegistry::new(db.pool().clone());
    let ingestor = Ingestor::new(registry.clone(), Arc::new(store.clone()), max_depth);
    (db, registry, ingestor)
}

fn names(files: &[fileshare::SharedFile]) -> Vec<&str> {
    files.iter().map(|f| f.name.as_str()).collect()
}

// ============================================================================
// Flattening
// ============================================================================

#[tokio::test]
async fn test_nested_containers_flatten_into_one_folder() {
    let store = MemoryStore::new();
    store.add_container("mem://music", "Music", &["mem://music/intro", "mem://music/album"]);
    store.add_leaf("mem://music/intro", "intro.mp3", "audio/mpeg", b"intro");
    store.add_container("mem://music/album", "Album", &["mem://music/album/one", "mem://music/album/two"]);
    store.add_leaf("mem://music/album/one", "one.mp3", "audio/mpeg", b"1");
    store.add_leaf("mem://music/album/two", "two.mp3", "audio/mpeg", b"22");

    let (_db, registry, ingestor) = setup(&store, 32).await;
    let (folder, report) = ingestor.share_folder("mem://music").await.unwrap();

    assert_eq!(folder.name, "Music");
    assert_eq!(report, IngestReport { added: 3, skipped: 0 });
    assert_eq!(registry.list_folders().await.unwrap().len(), 1);

    let files = registry.list_children(folder.id).await.unwrap();
    assert_eq!(names(&files), vec!["intro.mp3", "one.mp3", "two.mp3"]);
    assert_eq!(files[2].known_size(), Some(2));
    assert_eq!(files[2].mime_type, "audio/mpeg");
}

#[tokio::test]
async fn test_single_leaf_source() {
    let store = MemoryStore::new();
    store.add_leaf("mem://notes", "notes.txt", "text/plain", b"hi");

    let (_db, registry, ingestor) = setup(&store, 32).await;
    let (folder, report) = ingestor.share_folder("mem://notes").await.unwrap();

    assert_eq!(folder.name, "notes.txt");
    assert_eq!(report.added, 1);
    let files = registry.list_children(folder.id).await.unwrap();
    assert_eq!(files[0].storage_ref, "mem://notes");
}

#[tokio::test]
async fn test_reingest_does_not_duplicate() {
    let store = MemoryStore::new();
    store.add_container("mem://docs", "Docs", &["mem://docs/a"]);
    store.add_leaf("mem://docs/a", "a.txt", "text/plain", b"a");

    let (_db, registry, ingestor) = setup(&store, 32).await;
    let (first, _) = ingestor.share_folder("mem://docs").await.unwrap();

    store.add_container("mem://docs", "Docs", &["mem://docs/a", "mem://docs/b"]);
    store.add_leaf("mem://docs/b", "b.txt", "text/plain", b"b");
    let (second, report) = ingestor.share_folder("mem://docs").await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(report.added, 2);
    let files = registry.list_children(first.id).await.unwrap();
    assert_eq!(names(&files), vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn test_same_name_in_subcontainers_keeps_one_entry() {
    let store = MemoryStore::new();
    store.add_container("mem://r", "r", &["mem://r/x", "mem://r/y"]);
    store.add_container("mem://r/x", "x", &["mem://r/x/readme"]);
    store.add_container("mem://r/y", "y", &["mem://r/y/readme"]);
    store.add_leaf("mem://r/x/readme", "README", "text/plain", b"x");
    store.add_leaf("mem://r/y/readme", "README", "text/plain", b"yy");

    let (_db, registry, ingestor) = setup(&store, 32).await;
    let (folder, report) = ingestor.share_folder("mem://r").await.unwrap();

    assert_eq!(report.added, 2);
    let files = registry.list_children(folder.id).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].storage_ref, "mem://r/y/readme");
}

// ============================================================================
// Failures and bounds
// ============================================================================

#[tokio::test]
async fn test_cycles_terminate() {
    let store = MemoryStore::new();
    store.add_container("mem://r", "r", &["mem://r/a", "mem://r/sub"]);
    store.add_leaf("mem://r/a", "a.txt", "text/plain", b"a");
    store.add_container("mem://r/sub", "sub", &["mem://r", "mem://r/sub"]);

    let (_db, registry, ingestor) = setup(&store, 32).await;
    let (folder, report) = ingestor.share_folder("mem://r").await.unwrap();

    assert_eq!(report, IngestReport { added: 1, skipped: 2 });
    assert_eq!(registry.count_files(folder.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unreadable_items_are_skipped() {
    let store = MemoryStore::new();
    store.add_container(
        "mem://r",
        "r",
        &["mem://r/ok", "mem://r/broken", "mem://r/missing", "mem://r/last"],
    );
    store.add_leaf("mem://r/ok", "ok.txt", "text/plain", b"ok");
    store.add_broken_container("mem://r/broken", "broken");
    store.add_leaf("mem://r/last", "last.txt", "text/plain", b"last");

    let (_db, registry, ingestor) = setup(&store, 32).await;
    let (folder, report) = ingestor.share_folder("mem://r").await.unwrap();

    assert_eq!(report, IngestReport { added: 2, skipped: 2 });
    let files = registry.list_children(folder.id).await.unwrap();
    assert_eq!(names(&files), vec!["ok.txt", "last.txt"]);
}

#[tokio::test]
async fn test_depth_bound() {
    let store = MemoryStore::new();
    store.add_container("mem://0", "0", &["mem://0/f", "mem://1"]);
    store.add_leaf("mem://0/f", "f0", "text/plain", b"");
    store.add_container("mem://1", "1", &["mem://1/f", "mem://2"]);
    store.add_leaf("mem://1/f", "f1", "text/plain", b"");
    store.add_container("mem://2", "2", &["mem://2/f"]);
    store.add_leaf("mem://2/f", "f2", "text/plain", b"");

    let (_db, registry, ingestor) = setup(&store, 2).await;
    let (folder, report) = ingestor.share_folder("mem://0").await.unwrap();

    assert_eq!(report, IngestReport { added: 2, skipped: 1 });
    let files = registry.list_children(folder.id).await.unwrap();
    assert_eq!(names(&files), vec!["f0", "f1"]);
}

#[tokio::test]
async fn test_missing_source_fails() {
    let store = MemoryStore::new();
    let (_db, registry, ingestor) = setup(&store, 32).await;

    let result = ingestor.share_folder("mem://nowhere").await;
    assert!(matches!(result, Err(FileShareError::Storage(_))));
    assert!(registry.list_folders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ingest_into_missing_folder() {
    let store = MemoryStore::new();
    store.add_leaf("mem://a", "a", "text/plain", b"");
    let (_db, _registry, ingestor) = setup(&store, 32).await;

    let result = ingestor.ingest("mem://a", 42).await;
    assert!(matches!(result, Err(FileShareError::NotFound(_))));
}

#[tokio::test]
async fn test_ingest_into_existing_folder() {
    let store = MemoryStore::new();
    store.add_container("mem://extra", "extra", &["mem://extra/z"]);
    store.add_leaf("mem://extra/z", "z.txt", "text/plain", b"z");

    let (_db, registry, ingestor) = setup(&store, 32).await;
    let folder = registry.add_folder("Mixed", "mem://mixed").await.unwrap();

    let report = ingestor.ingest("mem://extra", folder.id).await.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(registry.get_folder(folder.id).await.unwrap().name, "Mixed");
    assert_eq!(registry.count_files(folder.id).await.unwrap(), 1);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_adds_keep_one_row() {
    let store = MemoryStore::new();
    let (_db, registry, _ingestor) = setup(&store, 32).await;
    let folder = registry.add_folder("Docs", "mem://docs").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        let folder_id = folder.id;
        handles.push(tokio::spawn(async move {
            registry
                .add_file_to_folder(&NewSharedFile::new(
                    folder_id,
                    "same.txt",
                    format!("mem://docs/v{i}"),
                    "text/plain",
                ))
                .await
                .unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().id);
    }
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let files = registry.list_children(folder.id).await.unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].storage_ref.starts_with("mem://docs/v"));

    registry
        .add_file_to_folder(&NewSharedFile::new(
            folder.id,
            "same.txt",
            "mem://docs/final",
            "text/plain",
        ))
        .await
        .unwrap();
    let files = registry.list_children(folder.id).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].storage_ref, "mem://docs/final");
}
