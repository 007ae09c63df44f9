//! In-memory object store.
//!
//! Keeps every object in a map behind an async lock. Useful for tests and dry
//! runs; nothing survives the process.

use crate::{ObjectEntry, ObjectStore};
use chrono::{DateTime, Utc};
use memories_error::{BackendError, BackendErrorKind, BackendResult};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryObject {
    data: Vec<u8>,
    content_type: String,
    created_at: DateTime<Utc>,
}

/// Object store backed by a `BTreeMap`.
///
/// Signed URLs have the form
/// `memory://{bucket}/{key}?method=GET&expires={unix_secs}`.
#[derive(Debug)]
pub struct InMemoryStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, MemoryObject>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("event-photos")
    }
}

impl InMemoryStore {
    /// Create an empty store for `bucket`.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Bytes stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).map(|o| o.data.clone())
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    fn signed(&self, method: &str, key: &str, expires_at: DateTime<Utc>) -> String {
        format!(
            "memory://{}/{}?method={}&expires={}",
            self.bucket,
            key,
            method,
            expires_at.timestamp()
        )
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> BackendResult<()> {
        let mut objects = self.objects.write().await;
        if objects.contains_key(key) {
            return Err(BackendError::new(BackendErrorKind::AlreadyExists(
                key.to_string(),
            )));
        }
        objects.insert(
            key.to_string(),
            MemoryObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
                created_at: Utc::now(),
            },
        );
        tracing::debug!("Stored object in memory");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, prefix: &str) -> BackendResult<Vec<ObjectEntry>> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectEntry {
                key: key.clone(),
                size: Some(object.data.len() as u64),
                content_type: Some(object.content_type.clone()),
                created_at: Some(object.created_at),
            })
            .collect())
    }

    #[tracing::instrument(skip(self, keys), fields(count = keys.len()))]
    async fn delete(&self, keys: &[String]) -> BackendResult<()> {
        let mut objects = self.objects.write().await;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn sign_for_read(&self, key: &str, expires_at: DateTime<Utc>) -> BackendResult<String> {
        if !self.objects.read().await.contains_key(key) {
            return Err(BackendError::new(BackendErrorKind::NotFound(key.to_string())));
        }
        Ok(self.signed("GET", key, expires_at))
    }

    #[tracing::instrument(skip(self))]
    async fn sign_for_write(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
    ) -> BackendResult<String> {
        Ok(self.signed("PUT", key, expires_at))
    }
}
