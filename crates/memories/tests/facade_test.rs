//! Tests for the facade crate wiring: config to store to manager.

use memories::{BackendKind, MemoriesConfig, StorageErrorKind, StorageManager, build_store};
use std::io::Write;

#[tokio::test]
async fn test_manager_from_config_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(
        br#"
[store]
backend = "memory"

[policy]
quota_bytes = 4096
"#,
    )
    .unwrap();

    let config = MemoriesConfig::from_file(file.path()).unwrap();
    assert_eq!(config.store.backend, BackendKind::Memory);

    let manager = StorageManager::new(build_store(&config.store).unwrap(), &config);
    manager
        .upload_direct("party", "toast.mov", "video/quicktime", &[0u8; 4000])
        .await
        .unwrap();

    let err = manager
        .upload_direct("party", "speech.mov", "video/quicktime", &[0u8; 200])
        .await
        .unwrap_err();
    assert!(matches!(
        err.storage_kind(),
        Some(StorageErrorKind::QuotaExceeded {
            used_bytes: 4000,
            total_bytes: 4096
        })
    ));

    let usage = manager.usage("party").await.unwrap();
    assert_eq!(*usage.used_bytes(), 4000);
}
