//! Integration tests for the task ledger.

mod common;

use std::sync::Arc;

use base64::prelude::{BASE64_STANDARD, Engine as _};
use secrecy::SecretString;
use thumbledger::error::Error;
use thumbledger::ledger::TaskLedger;
use thumbledger::model::Task;
use thumbledger::store::{BlobStore, FsStore, MemoryStore, UploadSigner};

fn memory_ledger() -> (Arc<MemoryStore>, TaskLedger) {
    let store = Arc::new(MemoryStore::new(common::BUCKET));
    let ledger = TaskLedger::new(store.clone(), "todos.json", common::MAX_BYTES);
    (store, ledger)
}

#[tokio::test]
async fn list_on_fresh_store_is_empty() {
    let (store, ledger) = memory_ledger();
    assert!(ledger.list().await.unwrap().is_empty());
    // Reading must not create the document.
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn create_list_delete_round_trip() {
    let (_store, ledger) = memory_ledger();

    let created = ledger.create_from_body(br#"{"text":"buy milk"}"#, false).await.unwrap();
    assert_eq!(created.text, "buy milk");
    assert!(!created.completed);
    assert!(!created.id.is_empty());

    let tasks = ledger.list().await.unwrap();
    assert_eq!(tasks, vec![created.clone()]);

    let removed = ledger.delete(&created.id).await.unwrap();
    assert_eq!(removed, created);
    assert!(ledger.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn insertion_order_is_preserved() {
    let (_store, ledger) = memory_ledger();
    for text in ["one", "two", "three"] {
        ledger.create(text).await.unwrap();
    }
    let middle = ledger.list().await.unwrap()[1].id.clone();
    ledger.delete(&middle).await.unwrap();

    let texts: Vec<String> = ledger
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.text)
        .collect();
    assert_eq!(texts, ["one", "three"]);
}

#[tokio::test]
async fn blank_or_missing_text_is_rejected_without_writing() {
    let (store, ledger) = memory_ledger();

    for body in [&br#"{"text":"  "}"#[..], &b"{}"[..]] {
        assert!(matches!(
            ledger.create_from_body(body, false).await,
            Err(Error::InvalidRequest(_))
        ));
    }
    assert!(matches!(
        ledger.create_from_body(b"{oops", false).await,
        Err(Error::InvalidJson)
    ));
    assert!(store.keys().await.is_empty());
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let (_store, ledger) = memory_ledger();
    ledger.create("keep me").await.unwrap();

    assert!(matches!(
        ledger.delete("nonexistent-id").await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(ledger.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_id_is_a_validation_error() {
    let (_store, ledger) = memory_ledger();
    assert!(matches!(ledger.delete("").await, Err(Error::InvalidRequest(_))));
}

#[tokio::test]
async fn base64_bodies_are_accepted() {
    let (_store, ledger) = memory_ledger();
    let body = BASE64_STANDARD.encode(r#"{"text":"encoded"}"#);
    let task = ledger.create_from_body(body.as_bytes(), true).await.unwrap();
    assert_eq!(task.text, "encoded");
}

#[tokio::test]
async fn document_is_a_pretty_printed_json_array() {
    let (store, ledger) = memory_ledger();
    let task = ledger.create("  padded  ").await.unwrap();
    assert_eq!(task.text, "padded");

    let object = store.get("todos.json", common::MAX_BYTES).await.unwrap().unwrap();
    assert_eq!(object.content_type.as_deref(), Some("application/json"));

    let text = String::from_utf8(object.body).unwrap();
    assert!(text.starts_with("[\n"), "expected pretty JSON, got {text}");
    let stored: Vec<Task> = serde_json::from_str(&text).unwrap();
    assert_eq!(stored, vec![task]);
}

#[tokio::test]
async fn ledger_survives_reopening_a_directory_store() {
    let dir = tempfile::tempdir().unwrap();
    let signer = Arc::new(UploadSigner::new(SecretString::from("s"), "http://localhost"));

    let created = {
        let store = FsStore::open("b", dir.path(), Arc::clone(&signer)).await.unwrap();
        let ledger = TaskLedger::new(Arc::new(store), "todos.json", common::MAX_BYTES);
        ledger.create("persisted").await.unwrap()
    };

    let store = FsStore::open("b", dir.path(), signer).await.unwrap();
    let ledger = TaskLedger::new(Arc::new(store), "todos.json", common::MAX_BYTES);
    assert_eq!(ledger.list().await.unwrap(), vec![created]);
}

#[tokio::test]
async fn rewrites_keep_untouched_records_intact() {
    let (store, ledger) = memory_ledger();
    let seeded = r#"[{"id":"1700000000000-abc","text":"old","completed":true,"createdAt":"2023-11-14T22:13:20.000Z","priority":"high"}]"#;
    store
        .put("todos.json", seeded.as_bytes().to_vec(), Some("application/json"))
        .await
        .unwrap();

    let added = ledger.create("new").await.unwrap();

    let object = store.get("todos.json", common::MAX_BYTES).await.unwrap().unwrap();
    let text = String::from_utf8(object.body).unwrap();
    assert!(text.contains(r#""createdAt": "2023-11-14T22:13:20.000Z""#), "{text}");
    assert!(text.contains(r#""priority": "high""#), "{text}");

    ledger.delete(&added.id).await.unwrap();
    let tasks = ledger.list().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].extra.get("priority").and_then(|v| v.as_str()), Some("high"));
}

#[tokio::test]
async fn record_without_timestamp_does_not_break_the_ledger() {
    let (store, ledger) = memory_ledger();
    store
        .put("todos.json", br#"[{"id":"legacy","text":"no date","completed":false}]"#.to_vec(), None)
        .await
        .unwrap();

    let tasks = ledger.list().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].created_at.is_none());

    ledger.create("dated").await.unwrap();
    let object = store.get("todos.json", common::MAX_BYTES).await.unwrap().unwrap();
    let stored: Vec<serde_json::Value> = serde_json::from_slice(&object.body).unwrap();
    assert!(stored[0].get("createdAt").is_none());
    assert!(stored[1].get("createdAt").is_some());
}
