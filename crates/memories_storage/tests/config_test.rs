//! Tests for configuration loading and store construction.

use memories_error::MemoriesErrorKind;
use memories_storage::{BackendKind, MIB, MemoriesConfig, StoreConfig, build_store};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn write_toml(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_from_file_overrides_defaults() {
    let file = write_toml(
        r#"
[store]
backend = "memory"
bucket = "wedding-photos"

[policy]
max_image_bytes = 5242880
quota_bytes = 1073741824

[links]
share_secs = 600
"#,
    );

    let config = MemoriesConfig::from_file(file.path()).unwrap();
    assert_eq!(config.store.backend, BackendKind::Memory);
    assert_eq!(config.store.bucket, "wedding-photos");
    assert_eq!(config.policy.max_image_bytes, 5 * MIB);
    assert_eq!(config.policy.quota_bytes, 1024 * MIB);
    assert_eq!(config.links.share_secs, 600);

    // Untouched settings keep their defaults
    assert_eq!(config.policy.max_video_bytes, 100 * MIB);
    assert_eq!(config.links.listing_secs, 86_400);
    assert!(config.policy.image_types.contains(&"image/heic".to_string()));
}

#[test]
fn test_from_file_rejects_invalid_settings() {
    let file = write_toml(
        r#"
[links]
list_limit = 0
"#,
    );

    let err = MemoriesConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err.kind(), MemoriesErrorKind::Config(_)));
    assert!(err.to_string().contains("list_limit"));
}

#[test]
fn test_from_file_missing() {
    let err = MemoriesConfig::from_file("/nonexistent/memories.toml").unwrap_err();
    assert!(matches!(err.kind(), MemoriesErrorKind::Config(_)));
}

#[test]
fn test_build_filesystem_store() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig {
        backend: BackendKind::Filesystem,
        root: Some(temp_dir.path().to_path_buf()),
        signing_secret: Some("secret".to_string()),
        ..StoreConfig::default()
    };

    let store = build_store(&config).unwrap();
    assert_eq!(store.name(), "filesystem");
    assert!(temp_dir.path().join("event-photos").is_dir());
}

#[test]
fn test_secrets_are_not_serialized() {
    let config = StoreConfig {
        signing_secret: Some("hunter2".to_string()),
        secret_access_key: Some("aws-secret".to_string()),
        ..StoreConfig::default()
    };

    let json = serde_json::to_string(&config).unwrap();
    assert!(!json.contains("hunter2"));
    assert!(!json.contains("aws-secret"));
}
