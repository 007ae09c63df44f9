//! Tests for the filesystem backend, alone and behind the storage manager.

use chrono::{Duration, Utc};
use memories_error::BackendErrorKind;
use memories_storage::{FileSystemStore, MemoriesConfig, ObjectStore, StorageManager};
use std::sync::Arc;
use tempfile::TempDir;

fn store(dir: &TempDir) -> FileSystemStore {
    FileSystemStore::new(dir.path(), "http://localhost:8080/files", "test-secret").unwrap()
}

#[tokio::test]
async fn test_put_and_list() {
    let temp_dir = TempDir::new().unwrap();
    let storage = store(&temp_dir);

    storage
        .put("events/evt1/1-a.jpg", b"Hello, world!", "image/jpeg")
        .await
        .unwrap();
    storage
        .put("events/evt10/1-b.jpg", b"other", "image/jpeg")
        .await
        .unwrap();

    let entries = storage.list("events/evt1/").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "events/evt1/1-a.jpg");
    assert_eq!(entries[0].size, Some(13));
    assert_eq!(entries[0].content_type.as_deref(), Some("image/jpeg"));
    assert!(entries[0].created_at.is_some());

    // Object bytes land at root/key
    let on_disk = std::fs::read(temp_dir.path().join("events/evt1/1-a.jpg")).unwrap();
    assert_eq!(on_disk, b"Hello, world!");
}

#[tokio::test]
async fn test_put_is_create_only() {
    let temp_dir = TempDir::new().unwrap();
    let storage = store(&temp_dir);

    storage
        .put("events/evt1/1-a.jpg", b"original", "image/jpeg")
        .await
        .unwrap();
    let err = storage
        .put("events/evt1/1-a.jpg", b"replacement", "image/jpeg")
        .await
        .unwrap_err();
    assert!(matches!(err.kind, BackendErrorKind::AlreadyExists(_)));

    let on_disk = std::fs::read(temp_dir.path().join("events/evt1/1-a.jpg")).unwrap();
    assert_eq!(on_disk, b"original");
}

#[tokio::test]
async fn test_list_missing_prefix_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let storage = store(&temp_dir);

    assert!(storage.list("events/nobody/").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_removes_object_and_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let storage = store(&temp_dir);

    storage
        .put("events/evt1/1-a.jpg", b"data", "image/jpeg")
        .await
        .unwrap();
    storage
        .delete(&["events/evt1/1-a.jpg".to_string(), "events/evt1/missing.jpg".to_string()])
        .await
        .unwrap();

    assert!(storage.list("events/evt1/").await.unwrap().is_empty());
    assert!(!temp_dir.path().join(".meta/events/evt1/1-a.jpg.json").exists());

    let err = storage
        .sign_for_read("events/evt1/1-a.jpg", Utc::now() + Duration::seconds(60))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_write_url_verifies_as_put() {
    let temp_dir = TempDir::new().unwrap();
    let storage = store(&temp_dir);

    let url = storage
        .sign_for_write("events/evt1/1-new.mp4", Utc::now() + Duration::seconds(300))
        .await
        .unwrap();
    let verified = storage.verify(&url, Utc::now()).unwrap();
    assert_eq!(verified.method, "PUT");
    assert_eq!(verified.key, "events/evt1/1-new.mp4");
}

#[tokio::test]
async fn test_manager_over_filesystem() {
    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(store(&temp_dir));
    let manager = StorageManager::new(storage.clone(), &MemoriesConfig::default());

    let stored = manager
        .upload_direct("evt1", "Beach Day.png", "image/png", &[9u8; 512])
        .await
        .unwrap();
    assert!(stored.name().ends_with("-Beach_Day.png"));

    let files = manager.list_files("evt1").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].original_name(), "Beach_Day.png");
    assert_eq!(*files[0].size(), 512);
    assert_eq!(files[0].mime_type(), "image/png");

    let link = files[0].access_url().as_ref().unwrap();
    let verified = storage.verify(link.url(), Utc::now()).unwrap();
    assert_eq!(verified.method, "GET");
    assert_eq!(verified.key, format!("events/evt1/{}", stored.name()));
    assert_eq!(verified.expires_at.timestamp(), link.expires_at().timestamp());

    manager.delete_namespace("evt1").await.unwrap();
    assert!(manager.list_files("evt1").await.unwrap().is_empty());
    assert_eq!(*manager.usage("evt1").await.unwrap().used_bytes(), 0);
}
