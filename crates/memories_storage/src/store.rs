//! Object store capability.

use chrono::{DateTime, Utc};
use memories_error::{BackendError, BackendErrorKind, BackendResult};

/// One object as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Full storage key
    pub key: String,
    /// Size in bytes, if the backend reported it
    pub size: Option<u64>,
    /// Content type, if the backend reported it
    pub content_type: Option<String>,
    /// Creation time, if the backend reported it
    pub created_at: Option<DateTime<Utc>>,
}

/// Trait for pluggable object storage backends.
///
/// This is the whole surface the storage manager depends on. Implementations
/// are injected as `Arc<dyn ObjectStore>`; they never apply upload policy and
/// never translate their errors into caller-facing kinds.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs (e.g. "memory", "filesystem", "s3").
    fn name(&self) -> &'static str;

    /// Write an object.
    ///
    /// Writes are create-only: if `key` already exists the implementation
    /// must fail with `BackendErrorKind::AlreadyExists` and leave the existing
    /// object untouched. A write either lands completely or not at all.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> BackendResult<()>;

    /// List every object whose key starts with `prefix`.
    ///
    /// Order is unspecified.
    async fn list(&self, prefix: &str) -> BackendResult<Vec<ObjectEntry>>;

    /// Metadata of one object.
    ///
    /// The default looks the key up through [`list`](Self::list). Backends
    /// whose listings omit content types override this with a direct lookup.
    ///
    /// # Errors
    ///
    /// `BackendErrorKind::NotFound` if the object does not exist.
    async fn head(&self, key: &str) -> BackendResult<ObjectEntry> {
        self.list(key)
            .await?
            .into_iter()
            .find(|entry| entry.key == key)
            .ok_or_else(|| BackendError::new(BackendErrorKind::NotFound(key.to_string())))
    }

    /// Delete a batch of objects.
    ///
    /// Keys that do not exist are ignored.
    async fn delete(&self, keys: &[String]) -> BackendResult<()>;

    /// Mint a read URL that stops working at `expires_at`.
    ///
    /// The caller computes the expiry so the URL and the expiry reported
    /// alongside it name the same instant.
    ///
    /// # Errors
    ///
    /// `BackendErrorKind::NotFound` if the object does not exist.
    async fn sign_for_read(&self, key: &str, expires_at: DateTime<Utc>) -> BackendResult<String>;

    /// Mint a write URL, for an object that may not exist yet, that stops
    /// working at `expires_at`.
    async fn sign_for_write(&self, key: &str, expires_at: DateTime<Utc>)
    -> BackendResult<String>;
}
