//! S3-compatible object store.
//!
//! Wraps `object_store`'s Amazon S3 client, which also speaks to MinIO and
//! other S3-compatible services through a custom endpoint.

use crate::{ObjectEntry, ObjectStore, StoreConfig};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use memories_error::{BackendError, BackendErrorKind, BackendResult, ConfigError, MemoriesResult};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{
    Attribute, Attributes, GetOptions, ObjectStore as RemoteStore, PutMode, PutOptions,
    PutPayload,
};
use std::time::Duration;

/// Object store backed by an S3 bucket.
///
/// Writes are conditional (`PutMode::Create`) so an existing key is never
/// replaced. Read links are presigned GET URLs, issued only after a `HEAD`
/// confirms the object exists.
#[derive(Debug)]
pub struct S3Store {
    client: AmazonS3,
    bucket: String,
}

impl S3Store {
    /// Wrap an already-built client.
    pub fn new(client: AmazonS3, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the client cannot be built.
    #[tracing::instrument(skip(config), fields(bucket = %config.bucket))]
    pub fn from_config(config: &StoreConfig) -> MemoriesResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_allow_http(config.allow_http);

        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(access_key_id) = config.resolved_access_key_id() {
            builder = builder.with_access_key_id(access_key_id);
        }
        if let Some(secret_access_key) = config.resolved_secret_access_key() {
            builder = builder.with_secret_access_key(secret_access_key);
        }

        let client = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build S3 store: {}", e)))?;

        tracing::info!(endpoint = ?config.endpoint, region = ?config.region, "Created S3 store");
        Ok(Self::new(client, config.bucket.clone()))
    }
}

/// Presign lifetime from now until `expires_at`.
///
/// S3 stamps presigned URLs with the wall clock, so the lifetime is measured
/// from `Utc::now()`.
fn presign_ttl(key: &str, expires_at: DateTime<Utc>) -> BackendResult<Duration> {
    (expires_at - Utc::now())
        .to_std()
        .ok()
        .filter(|ttl| !ttl.is_zero())
        .ok_or_else(|| {
            BackendError::new(BackendErrorKind::Unavailable(format!(
                "expiry {} for {} is already past",
                expires_at, key
            )))
        })
}

#[track_caller]
fn backend_error(e: object_store::Error) -> BackendError {
    match e {
        object_store::Error::NotFound { path, .. } => {
            BackendError::new(BackendErrorKind::NotFound(path))
        }
        object_store::Error::AlreadyExists { path, .. }
        | object_store::Error::Precondition { path, .. } => {
            BackendError::new(BackendErrorKind::AlreadyExists(path))
        }
        other => BackendError::new(BackendErrorKind::Unavailable(other.to_string())),
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    #[tracing::instrument(skip(self, data), fields(bucket = %self.bucket, size = data.len()))]
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> BackendResult<()> {
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            mode: PutMode::Create,
            attributes,
            ..Default::default()
        };

        self.client
            .put_opts(
                &ObjectPath::from(key),
                PutPayload::from(data.to_vec()),
                options,
            )
            .await
            .map_err(backend_error)?;
        tracing::info!("Uploaded object");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list(&self, prefix: &str) -> BackendResult<Vec<ObjectEntry>> {
        // S3 prefixes here are whole path segments; list the enclosing
        // directory and filter on the raw string prefix.
        let directory = prefix.rfind('/').map(|idx| ObjectPath::from(&prefix[..idx]));

        let mut stream = self.client.list(directory.as_ref());
        let mut entries = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(backend_error)?;
            let key = meta.location.to_string();
            if !key.starts_with(prefix) {
                continue;
            }
            entries.push(ObjectEntry {
                key,
                size: Some(meta.size as u64),
                content_type: None,
                created_at: Some(meta.last_modified),
            });
        }

        tracing::debug!(count = entries.len(), "Listed objects");
        Ok(entries)
    }

    /// S3 listings carry no content type; a `HEAD` returns the stored attribute.
    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn head(&self, key: &str) -> BackendResult<ObjectEntry> {
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self
            .client
            .get_opts(&ObjectPath::from(key), options)
            .await
            .map_err(backend_error)?;

        Ok(ObjectEntry {
            key: key.to_string(),
            size: Some(result.meta.size as u64),
            content_type: result
                .attributes
                .get(&Attribute::ContentType)
                .map(|value| value.to_string()),
            created_at: Some(result.meta.last_modified),
        })
    }

    #[tracing::instrument(skip(self, keys), fields(bucket = %self.bucket, count = keys.len()))]
    async fn delete(&self, keys: &[String]) -> BackendResult<()> {
        let locations = futures::stream::iter(
            keys.iter()
                .map(|key| Ok(ObjectPath::from(key.as_str())))
                .collect::<Vec<_>>(),
        )
        .boxed();

        let mut results = self.client.delete_stream(locations);
        while let Some(result) = results.next().await {
            match result {
                Ok(_) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(backend_error(e)),
            }
        }
        tracing::info!("Deleted objects");
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn sign_for_read(&self, key: &str, expires_at: DateTime<Utc>) -> BackendResult<String> {
        let ttl = presign_ttl(key, expires_at)?;
        let path = ObjectPath::from(key);
        self.client.head(&path).await.map_err(backend_error)?;
        let url = self
            .client
            .signed_url(http::Method::GET, &path, ttl)
            .await
            .map_err(backend_error)?;
        Ok(url.to_string())
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket))]
    async fn sign_for_write(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
    ) -> BackendResult<String> {
        let ttl = presign_ttl(key, expires_at)?;
        let url = self
            .client
            .signed_url(http::Method::PUT, &ObjectPath::from(key), ttl)
            .await
            .map_err(backend_error)?;
        Ok(url.to_string())
    }
}
