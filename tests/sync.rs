use std::fs;
use std::path::Path;

use tempfile::TempDir;

use studio_bridge::storage::{MemoryStore, StoreOperation};
use studio_bridge::sync::{delete_prefix, sync, Credentials, SourceSet, SyncError, SyncTarget};

const PREFIX: &str = "blondie/";

fn target() -> SyncTarget {
    SyncTarget::new(
        "modelcrew",
        PREFIX,
        "us-east-2",
        None,
        Credentials::new("AKIDEXAMPLE", "secret"),
    )
    .unwrap()
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// The dataset layout from a typical model run.
fn dataset() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "outputs/faceswapped/a.jpg", "jpeg-a");
    write(tmp.path(), "outputs/faceswapped/sub/b.jpg", "jpeg-b");
    write(tmp.path(), "outputs/faceswapped/preview.png", "png");
    write(tmp.path(), "captions/a.txt", "a caption");
    write(tmp.path(), "captions/readme.md", "ignored");
    write(tmp.path(), "meta/meta.jsonl", "{\"file\":\"a.jpg\"}\n");
    tmp
}

fn keys_under(store: &MemoryStore, prefix: &str) -> Vec<String> {
    store
        .keys()
        .into_iter()
        .filter(|key| key.starts_with(prefix))
        .collect()
}

#[tokio::test]
async fn test_end_to_end_replaces_prefix() {
    let tmp = dataset();
    let store = MemoryStore::new("modelcrew");
    store.insert("blondie/outputs/faceswapped/stale.jpg", "old");
    store.insert("blondie/captions/a.txt", "old caption");
    store.insert("brunette/captions/keep.txt", "other model");

    let report = sync(&store, &target(), &SourceSet::for_dataset(tmp.path()))
        .await
        .unwrap();

    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.uploaded_count, 4);
    assert_eq!(report.failed_count, 0);
    assert_eq!(
        keys_under(&store, PREFIX),
        vec![
            "blondie/captions/a.txt",
            "blondie/meta/meta.jsonl",
            "blondie/outputs/faceswapped/a.jpg",
            "blondie/outputs/faceswapped/sub/b.jpg",
        ]
    );
    assert_eq!(keys_under(&store, "brunette/"), vec!["brunette/captions/keep.txt"]);

    let caption = store.get("blondie/captions/a.txt").unwrap();
    assert_eq!(&caption.content[..], b"a caption");
    assert_eq!(caption.content_type, "text/plain");
    assert_eq!(
        store.get("blondie/outputs/faceswapped/sub/b.jpg").unwrap().content_type,
        "image/jpeg"
    );
    assert_eq!(
        store.get("blondie/meta/meta.jsonl").unwrap().content_type,
        "application/jsonl"
    );
}

#[tokio::test]
async fn test_every_delete_happens_before_any_upload() {
    let tmp = dataset();
    let store = MemoryStore::new("modelcrew").with_page_size(1);
    for i in 0..4 {
        store.insert(format!("blondie/old/{}.jpg", i), "old");
    }

    let report = sync(&store, &target(), &SourceSet::for_dataset(tmp.path()))
        .await
        .unwrap();
    assert_eq!(report.deleted_count, 4);

    let operations = store.operations();
    let last_delete = operations
        .iter()
        .rposition(|op| matches!(op, StoreOperation::Delete { .. }))
        .unwrap();
    let first_put = operations
        .iter()
        .position(|op| matches!(op, StoreOperation::Put { .. }))
        .unwrap();
    assert!(last_delete < first_put);
}

#[tokio::test]
async fn test_delete_phase_is_idempotent() {
    let store = MemoryStore::new("modelcrew").with_page_size(2);
    for i in 0..5 {
        store.insert(format!("blondie/{}.txt", i), "x");
    }

    assert_eq!(delete_prefix(&store, PREFIX).await.unwrap(), 5);
    assert_eq!(delete_prefix(&store, PREFIX).await.unwrap(), 0);
}

#[tokio::test]
async fn test_repeated_sync_converges() {
    let tmp = dataset();
    let store = MemoryStore::new("modelcrew");
    let sources = SourceSet::for_dataset(tmp.path());

    let first = sync(&store, &target(), &sources).await.unwrap();
    let after_first = keys_under(&store, PREFIX);
    let second = sync(&store, &target(), &sources).await.unwrap();

    assert_eq!(first.deleted_count, 0);
    assert_eq!(second.deleted_count, 4);
    assert_eq!(second.uploaded_count, 4);
    assert_eq!(keys_under(&store, PREFIX), after_first);
}

#[tokio::test]
async fn test_listing_failure_aborts_before_uploads() {
    let tmp = dataset();
    let store = MemoryStore::new("modelcrew");
    store.fail_listing();

    let err = sync(&store, &target(), &SourceSet::for_dataset(tmp.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Delete(_)));
    assert!(!store
        .operations()
        .iter()
        .any(|op| matches!(op, StoreOperation::Put { .. })));
}

#[tokio::test]
async fn test_delete_failure_aborts_before_uploads() {
    let tmp = dataset();
    let store = MemoryStore::new("modelcrew");
    store.insert("blondie/old.jpg", "old");
    store.fail_deletes();

    let result = sync(&store, &target(), &SourceSet::for_dataset(tmp.path())).await;

    assert!(result.is_err());
    assert_eq!(store.keys(), vec!["blondie/old.jpg"]);
}

#[tokio::test]
async fn test_upload_failure_does_not_stop_the_run() {
    let tmp = dataset();
    let store = MemoryStore::new("modelcrew");
    store.fail_put("blondie/outputs/faceswapped/a.jpg");

    let report = sync(&store, &target(), &SourceSet::for_dataset(tmp.path()))
        .await
        .unwrap();

    assert_eq!(report.uploaded_count, 3);
    assert_eq!(report.failed_count, 1);
    assert_eq!(
        report.failures[0].object_key,
        "blondie/outputs/faceswapped/a.jpg"
    );
    assert!(store.get("blondie/meta/meta.jsonl").is_some());
}

#[tokio::test]
async fn test_missing_sources_still_clear_the_prefix() {
    let tmp = TempDir::new().unwrap();
    let store = MemoryStore::new("modelcrew");
    store.insert("blondie/outputs/faceswapped/old.jpg", "old");

    let report = sync(&store, &target(), &SourceSet::for_dataset(tmp.path()))
        .await
        .unwrap();

    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.uploaded_count, 0);
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn test_model_layout() {
    let models = TempDir::new().unwrap();
    write(models.path(), "blondie/outputs/faceswapped/x.jpeg", "jpeg");
    write(models.path(), "dataset/blondie/captions/x.txt", "caption");
    write(models.path(), "dataset/blondie/meta/meta.jsonl", "{}\n");
    let store = MemoryStore::new("modelcrew");

    let report = sync(
        &store,
        &target(),
        &SourceSet::for_model(models.path(), "blondie"),
    )
    .await
    .unwrap();

    assert_eq!(report.uploaded_count, 3);
    assert_eq!(
        store.keys(),
        vec![
            "blondie/captions/x.txt",
            "blondie/meta/meta.jsonl",
            "blondie/outputs/faceswapped/x.jpeg",
        ]
    );
}
