use memex::store::Store;
use tempfile::TempDir;

async fn open_store() -> (TempDir, Store) {
    let tmp = TempDir::new().unwrap();
    let store = Store::open_path(&tmp.path().join("memex.db"), 4)
        .await
        .unwrap();
    (tmp, store)
}

async fn image_rows(store: &Store) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM image")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_open_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("nested/dir/memex.db");

    let store = Store::open_path(&db, 2).await.unwrap();
    store.upsert("/p/a.png", "kept", None, 1).await.unwrap();
    store.close().await;

    let store = Store::open_path(&db, 2).await.unwrap();
    assert_eq!(store.search("kept").await.unwrap().len(), 1);
    store.check_index().await.unwrap();
}

#[tokio::test]
async fn test_hello_note_scenario() {
    let (_tmp, store) = open_store().await;

    let doc = store
        .upsert("/tmp/a.jpg", "hello world", Some(""), 100)
        .await
        .unwrap();
    assert_eq!(doc.comment, "");

    let hits = store.search("hello").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "/tmp/a.jpg");
    assert!(store.search("note").await.unwrap().is_empty());

    let noted = store
        .upsert("/tmp/a.jpg", "hello world", Some("note"), 100)
        .await
        .unwrap();
    assert_eq!(noted.id, doc.id);
    assert_eq!(noted.comment, "note");
    assert_eq!(image_rows(&store).await, 1);
    store.check_index().await.unwrap();

    let hits = store.search("note").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, doc.id);

    // The content is still indexed after the comment changed.
    let hits = store.search("hello").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, doc.id);

    assert!(store.search("absent").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_ignores_path() {
    let (_tmp, store) = open_store().await;
    store
        .upsert("/photos/receipt.png", "total due", None, 1)
        .await
        .unwrap();

    assert!(store.search("receipt").await.unwrap().is_empty());
    assert!(store.search("photos").await.unwrap().is_empty());
    assert_eq!(store.search("due").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_blank_query_is_empty() {
    let (_tmp, store) = open_store().await;
    store.upsert("/p/a.png", "anything", None, 1).await.unwrap();

    assert!(store.search("").await.unwrap().is_empty());
    assert!(store.search("   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_orders_newest_first() {
    let (_tmp, store) = open_store().await;
    store.upsert("/p/old.png", "invoice", None, 10).await.unwrap();
    store.upsert("/p/new.png", "invoice", None, 30).await.unwrap();
    store.upsert("/p/mid.png", "invoice", None, 20).await.unwrap();

    let paths: Vec<String> = store
        .search("invoice")
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.path)
        .collect();
    assert_eq!(paths, vec!["/p/new.png", "/p/mid.png", "/p/old.png"]);
}

#[tokio::test]
async fn test_upsert_never_duplicates() {
    let (_tmp, store) = open_store().await;

    let first = store.upsert("/p/a.png", "first", None, 1).await.unwrap();
    let second = store.upsert("/p/a.png", "second", None, 2).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(image_rows(&store).await, 1);
    assert_eq!(second.content, "second");
    assert_eq!(second.timestamp, 2);

    // The index follows the update.
    assert!(store.search("first").await.unwrap().is_empty());
    assert_eq!(store.search("second").await.unwrap().len(), 1);
    store.check_index().await.unwrap();
}

#[tokio::test]
async fn test_upsert_without_comment_keeps_existing() {
    let (_tmp, store) = open_store().await;

    let doc = store.upsert("/p/a.png", "v1", None, 1).await.unwrap();
    assert_eq!(doc.comment, "");

    store.set_comment(doc.id, "whiteboard").await.unwrap();
    let doc = store.upsert("/p/a.png", "v2", None, 2).await.unwrap();
    assert_eq!(doc.comment, "whiteboard");
    assert_eq!(doc.content, "v2");

    let doc = store
        .upsert("/p/a.png", "v3", Some("replaced"), 3)
        .await
        .unwrap();
    assert_eq!(doc.comment, "replaced");
    assert!(store.search("whiteboard").await.unwrap().is_empty());
    assert_eq!(store.search("replaced").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_timestamp_of() {
    let (_tmp, store) = open_store().await;

    assert_eq!(store.timestamp_of("/p/a.png").await.unwrap(), None);
    store.upsert("/p/a.png", "", None, 1234).await.unwrap();
    assert_eq!(store.timestamp_of("/p/a.png").await.unwrap(), Some(1234));
}

#[tokio::test]
async fn test_empty_content_is_stored() {
    let (_tmp, store) = open_store().await;

    let doc = store.upsert("/p/blank.png", "", None, 5).await.unwrap();
    let fetched = store.get(doc.id).await.unwrap().unwrap();
    assert_eq!(fetched, doc);
    assert_eq!(
        store.get_by_path("/p/blank.png").await.unwrap(),
        Some(doc)
    );
}

#[tokio::test]
async fn test_get_missing() {
    let (_tmp, store) = open_store().await;
    assert!(store.get(42).await.unwrap().is_none());
    assert!(store.set_comment(42, "x").await.unwrap().is_none());
    assert!(!store.delete(42).await.unwrap());
}

#[tokio::test]
async fn test_delete_removes_index_entry() {
    let (_tmp, store) = open_store().await;

    let a = store.upsert("/p/a.png", "alpha shared", None, 1).await.unwrap();
    store.upsert("/p/b.png", "beta shared", None, 2).await.unwrap();

    assert!(store.delete(a.id).await.unwrap());
    assert!(store.search("alpha").await.unwrap().is_empty());
    assert_eq!(store.search("shared").await.unwrap().len(), 1);
    store.check_index().await.unwrap();
}

#[tokio::test]
async fn test_folder_upsert_twice_lists_once() {
    let (_tmp, store) = open_store().await;

    let first = store.folder_upsert("/pics", 10).await.unwrap();
    let second = store.folder_upsert("/pics", 20).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.timestamp, 20);

    store.folder_upsert("/more", 15).await.unwrap();
    let listed = store.folder_list().await.unwrap();
    assert_eq!(
        listed,
        vec![
            std::path::PathBuf::from("/more"),
            std::path::PathBuf::from("/pics")
        ]
    );
}

#[tokio::test]
async fn test_sweep_removes_vanished_files() {
    let (tmp, store) = open_store().await;

    let present = tmp.path().join("present.png");
    std::fs::write(&present, b"x").unwrap();
    let gone = tmp.path().join("gone.png");

    store
        .upsert(present.to_str().unwrap(), "still here", None, 1)
        .await
        .unwrap();
    store
        .upsert(gone.to_str().unwrap(), "vanished", None, 1)
        .await
        .unwrap();

    let report = store.sweep().await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.removed, 1);

    assert_eq!(image_rows(&store).await, 1);
    assert!(store.search("vanished").await.unwrap().is_empty());
    assert_eq!(store.search("still").await.unwrap().len(), 1);
    store.check_index().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_writers() {
    let (_tmp, store) = open_store().await;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..20 {
        let store = store.clone();
        tasks.spawn(async move {
            store
                .upsert(&format!("/p/{}.png", i), "parallel", None, i)
                .await
                .unwrap();
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap();
    }

    assert_eq!(image_rows(&store).await, 20);
    assert_eq!(store.search("parallel").await.unwrap().len(), 20);
    store.check_index().await.unwrap();
}

#[tokio::test]
async fn test_stats_counts() {
    let (_tmp, store) = open_store().await;
    store.upsert("/p/a.png", "words", Some("tagged"), 1).await.unwrap();
    store.upsert("/p/b.png", "", None, 2).await.unwrap();
    store.folder_upsert("/p", 3).await.unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.with_text, 1);
    assert_eq!(stats.with_comment, 1);
    assert_eq!(stats.folders, 1);
}
