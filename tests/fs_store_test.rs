//! Integration tests for the directory-backed blob store.

use std::sync::Arc;

use secrecy::SecretString;
use thumbledger::error::Error;
use thumbledger::store::{BlobStore, FsStore, UploadSigner};

async fn open(dir: &tempfile::TempDir) -> FsStore {
    let signer = Arc::new(UploadSigner::new(SecretString::from("s"), "http://localhost"));
    FsStore::open("bucket", dir.path().join("bucket"), signer)
        .await
        .unwrap()
}

#[tokio::test]
async fn absent_object_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;
    assert!(store.get("raw/nothing.jpg", 1024).await.unwrap().is_none());
}

#[tokio::test]
async fn nested_keys_round_trip_with_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;

    store
        .put("raw/todo-images/a.png", vec![1, 2, 3], Some("image/png"))
        .await
        .unwrap();
    let object = store.get("raw/todo-images/a.png", 1024).await.unwrap().unwrap();
    assert_eq!(object.body, vec![1, 2, 3]);
    assert_eq!(object.content_type.as_deref(), Some("image/png"));
    assert!(store.root().join("raw/todo-images/a.png").is_file());
}

#[tokio::test]
async fn overwrite_replaces_body_and_clears_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;

    store.put("k.bin", vec![1; 10], Some("a/b")).await.unwrap();
    store.put("k.bin", vec![2; 3], None).await.unwrap();

    let object = store.get("k.bin", 1024).await.unwrap().unwrap();
    assert_eq!(object.body, vec![2; 3]);
    assert_eq!(object.content_type, None);
}

#[tokio::test]
async fn reads_are_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;
    store.put("big", vec![0; 100], None).await.unwrap();

    assert!(store.get("big", 100).await.unwrap().is_some());
    assert!(matches!(
        store.get("big", 99).await,
        Err(Error::ObjectTooLarge { limit: 99, .. })
    ));
}

#[tokio::test]
async fn escaping_keys_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;
    for key in ["../outside", "raw/../../x", ".meta/raw/x.json", "/etc/passwd"] {
        assert!(matches!(
            store.put(key, vec![1], None).await,
            Err(Error::InvalidRequest(_))
        ));
    }
    assert!(!dir.path().join("outside").exists());
}

#[tokio::test]
async fn failed_body_write_leaves_previous_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir).await;
    store.put("doc", b"v1".to_vec(), Some("text/plain")).await.unwrap();

    // A non-empty directory at the object path makes the rename fail.
    let object_path = store.root().join("doc");
    std::fs::remove_file(&object_path).unwrap();
    std::fs::create_dir_all(object_path.join("blocker")).unwrap();

    assert!(store.put("doc", b"v2".to_vec(), Some("image/png")).await.is_err());

    let meta = std::fs::read_to_string(store.root().join(".meta/doc.json")).unwrap();
    assert!(meta.contains("text/plain"), "{meta}");
}
