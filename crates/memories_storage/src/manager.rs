//! Storage manager: the public operations over one object store.

use crate::path::{
    check_file_name, check_namespace, derive_key, namespace_prefix, object_key, relative_name,
    split_stored_name,
};
use crate::translate::translate;
use crate::{
    Clock, FileMetadata, LinkSettings, MAX_LINK_SECS, MemoriesConfig, ObjectEntry, ObjectStore, Quota,
    QuotaAccountant, SignedUrl, StoredFile, SystemClock, UploadCandidate, UploadPolicy,
    UploadTicket,
};
use chrono::{DateTime, Utc};
use memories_error::{MemoriesError, MemoriesResult, StorageError, StorageErrorKind};
use std::sync::Arc;
use std::time::Duration;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Orchestrates validation, key derivation, quota checks and link signing
/// against an injected [`ObjectStore`].
///
/// The manager is stateless between calls; clone it freely and share it
/// across tasks. No operation takes a lock. In particular the quota check in
/// [`upload_direct`](Self::upload_direct) is check-then-act: concurrent
/// uploads into one namespace can each pass the check and together exceed
/// the ceiling.
///
/// # Example
///
/// ```
/// use memories_storage::{InMemoryStore, MemoriesConfig, StorageManager};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = StorageManager::new(Arc::new(InMemoryStore::default()), &MemoriesConfig::default());
///
/// let stored = manager
///     .upload_direct("evt1", "sunset.jpg", "image/jpeg", b"...jpeg bytes...")
///     .await?;
/// let link = manager.share_file("evt1", stored.name(), None).await?;
/// println!("{} (until {})", link.url(), link.expires_at());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StorageManager {
    store: Arc<dyn ObjectStore>,
    policy: UploadPolicy,
    links: LinkSettings,
    quota: QuotaAccountant,
    clock: Arc<dyn Clock>,
}

impl StorageManager {
    /// Create a manager over `store` with the policy and link settings from `config`.
    pub fn new(store: Arc<dyn ObjectStore>, config: &MemoriesConfig) -> Self {
        tracing::debug!(
            backend = store.name(),
            quota_bytes = config.policy.quota_bytes,
            "Creating storage manager"
        );
        Self {
            quota: QuotaAccountant::new(store.clone(), config.policy.quota_bytes),
            store,
            policy: config.policy.clone(),
            links: config.links.clone(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for key derivation and expiries.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The upload policy in force.
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// The link settings in force.
    pub fn links(&self) -> &LinkSettings {
        &self.links
    }

    /// Mint a write URL so a client can upload straight to the store.
    ///
    /// Only the MIME type is checked: the size is unknown until the client
    /// uploads, so the size ceiling and quota are not enforced on this path.
    ///
    /// # Errors
    ///
    /// - `UnsupportedType` if `mime_type` is in neither allow-list
    /// - `StoreUnavailable` if the backend cannot mint a URL
    #[tracing::instrument(skip(self), fields(backend = self.store.name()))]
    pub async fn request_upload_url(
        &self,
        namespace: &str,
        file_name: &str,
        mime_type: &str,
    ) -> MemoriesResult<UploadTicket> {
        self.reject("request_upload_url", namespace, check_namespace(namespace))?;
        if self.policy.classify(mime_type).is_none() {
            return Err(self.rejected(
                "request_upload_url",
                namespace,
                StorageError::new(StorageErrorKind::UnsupportedType(mime_type.to_string())),
            ));
        }

        let now = self.clock.now();
        let key = derive_key(namespace, file_name, now);
        let expires_at = self.expiry(now, self.links.upload_url_ttl())?;

        let url = self.store.sign_for_write(&key, expires_at).await.map_err(|e| {
            let mut err = translate("request_upload_url", namespace, Some(&key), e);
            // A write URL for a key that does not exist yet is never "not found"
            if let StorageErrorKind::NotFound(missing) = &err.kind {
                err.kind = StorageErrorKind::StoreUnavailable(format!(
                    "backend refused to sign {}",
                    missing
                ));
            }
            err
        })?;

        tracing::info!(key = %key, "Issued upload URL");
        Ok(UploadTicket::new(SignedUrl::new(url, expires_at), key))
    }

    /// Validate and store a file, returning its descriptor with a 7-day read link.
    ///
    /// Order: type and size policy, then quota, then the write. Policy
    /// rejections happen before any backend call.
    ///
    /// # Errors
    ///
    /// - `UnsupportedType` / `TooLarge` from the upload policy
    /// - `QuotaExceeded` if the namespace has no room for `data`
    /// - `StoreUnavailable` if listing or writing fails
    #[tracing::instrument(skip(self, data), fields(backend = self.store.name(), size = data.len()))]
    pub async fn upload_direct(
        &self,
        namespace: &str,
        original_name: &str,
        mime_type: &str,
        data: &[u8],
    ) -> MemoriesResult<StoredFile> {
        let candidate = UploadCandidate::new(original_name, mime_type, data);

        self.reject("upload_direct", namespace, check_namespace(namespace))?;
        if candidate.original_name().is_empty() {
            return Err(self.rejected(
                "upload_direct",
                namespace,
                StorageError::new(StorageErrorKind::InvalidInput(
                    "file name must not be empty".to_string(),
                )),
            ));
        }
        let media_type = self.reject(
            "upload_direct",
            namespace,
            self.policy
                .validate(candidate.mime_type(), *candidate.size_bytes()),
        )?;

        let quota = self.quota.usage(namespace).await?;
        if !quota.fits(*candidate.size_bytes()) {
            return Err(self.rejected(
                "upload_direct",
                namespace,
                StorageError::new(StorageErrorKind::QuotaExceeded {
                    used_bytes: *quota.used_bytes(),
                    total_bytes: *quota.total_bytes(),
                }),
            ));
        }

        let now = self.clock.now();
        let key = derive_key(namespace, candidate.original_name(), now);
        self.store
            .put(&key, data, candidate.mime_type())
            .await
            .map_err(|e| translate("upload_direct", namespace, Some(&key), e))?;

        tracing::info!(
            key = %key,
            media_type = %media_type,
            size = candidate.size_bytes(),
            "Uploaded file"
        );

        let access_url = self
            .sign_quietly("upload_direct", namespace, &key, now, self.links.upload_link_ttl())
            .await;
        let name = relative_name(namespace, &key).unwrap_or(&key).to_string();

        Ok(StoredFile::new(
            name,
            candidate.original_name().clone(),
            *candidate.size_bytes(),
            candidate.mime_type().clone(),
            access_url,
            now,
        ))
    }

    /// List files in a namespace, newest first, each with a 24-hour read link.
    ///
    /// Signs one URL per object. Returns at most `links.list_limit` entries.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the listing fails. A failure to sign one entry
    /// is logged and leaves that entry without a link.
    #[tracing::instrument(skip(self), fields(backend = self.store.name()))]
    pub async fn list_files(&self, namespace: &str) -> MemoriesResult<Vec<StoredFile>> {
        self.reject("list_files", namespace, check_namespace(namespace))?;

        let mut entries = self.raw_listing("list_files", namespace).await?;
        let mut files: Vec<(String, ObjectEntry, DateTime<Utc>)> = entries
            .drain(..)
            .filter_map(|entry| {
                let name = relative_name(namespace, &entry.key)?.to_string();
                let created_at = created_at(&name, &entry);
                Some((name, entry, created_at))
            })
            .collect();
        files.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.0.cmp(&a.0)));
        files.truncate(self.links.list_limit);

        let now = self.clock.now();
        let ttl = self.links.listing_ttl();
        let mut listed = Vec::with_capacity(files.len());
        for (name, entry, created_at) in files {
            let content_type = match entry.content_type {
                Some(content_type) => content_type,
                None => self.content_type_of("list_files", namespace, &entry.key).await,
            };
            let access_url = self
                .sign_quietly("list_files", namespace, &entry.key, now, ttl)
                .await;
            let size = entry.size.unwrap_or_else(|| {
                tracing::warn!(namespace, key = %entry.key, "Object has no size metadata");
                0
            });
            let original_name = split_stored_name(&name)
                .map(|(_, original)| original.to_string())
                .unwrap_or_else(|| name.clone());
            listed.push(StoredFile::new(
                name,
                original_name,
                size,
                content_type,
                access_url,
                created_at,
            ));
        }

        tracing::debug!(count = listed.len(), "Listed files");
        Ok(listed)
    }

    /// Aggregate usage of a namespace.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the listing fails.
    #[tracing::instrument(skip(self))]
    pub async fn usage(&self, namespace: &str) -> MemoriesResult<Quota> {
        self.reject("usage", namespace, check_namespace(namespace))?;
        self.quota.usage(namespace).await
    }

    /// Whether `additional_bytes` more would fit right now.
    ///
    /// A snapshot: nothing reserves the space for a later upload.
    #[tracing::instrument(skip(self))]
    pub async fn has_space(&self, namespace: &str, additional_bytes: u64) -> MemoriesResult<bool> {
        self.reject("has_space", namespace, check_namespace(namespace))?;
        self.quota.has_space(namespace, additional_bytes).await
    }

    /// Mint a read link for one file.
    ///
    /// `ttl` defaults to `links.share_secs` (one hour).
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist
    /// - `InvalidInput` for a zero `ttl` or one longer than [`MAX_LINK_SECS`]
    /// - `StoreUnavailable` for any other backend failure
    #[tracing::instrument(skip(self), fields(backend = self.store.name()))]
    pub async fn share_file(
        &self,
        namespace: &str,
        file_name: &str,
        ttl: Option<Duration>,
    ) -> MemoriesResult<SignedUrl> {
        self.reject("share_file", namespace, check_namespace(namespace))?;
        self.reject("share_file", namespace, check_file_name(file_name))?;

        let ttl = ttl.unwrap_or_else(|| self.links.share_ttl());
        if ttl.is_zero() {
            return Err(self.rejected(
                "share_file",
                namespace,
                StorageError::new(StorageErrorKind::InvalidInput(
                    "ttl must be greater than zero".to_string(),
                )),
            ));
        }
        if ttl.as_secs() > MAX_LINK_SECS {
            return Err(self.rejected(
                "share_file",
                namespace,
                StorageError::new(StorageErrorKind::InvalidInput(format!(
                    "ttl of {}s exceeds the {}s maximum",
                    ttl.as_secs(),
                    MAX_LINK_SECS
                ))),
            ));
        }

        let now = self.clock.now();
        let expires_at = self.expiry(now, ttl)?;
        let key = object_key(namespace, file_name);
        let url = self
            .store
            .sign_for_read(&key, expires_at)
            .await
            .map_err(|e| translate("share_file", namespace, Some(&key), e))?;

        tracing::info!(key = %key, ttl_secs = ttl.as_secs(), "Issued share URL");
        Ok(SignedUrl::new(url, expires_at))
    }

    /// Size and content type of one file.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist
    /// - `StoreUnavailable` if the lookup fails
    #[tracing::instrument(skip(self), fields(backend = self.store.name()))]
    pub async fn file_metadata(
        &self,
        namespace: &str,
        file_name: &str,
    ) -> MemoriesResult<FileMetadata> {
        self.reject("file_metadata", namespace, check_namespace(namespace))?;
        self.reject("file_metadata", namespace, check_file_name(file_name))?;

        let key = object_key(namespace, file_name);
        let entry = self
            .store
            .head(&key)
            .await
            .map_err(|e| translate("file_metadata", namespace, Some(&key), e))?;

        let content_type = entry
            .content_type
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());
        let media_type = self.policy.classify(&content_type);
        Ok(FileMetadata::new(
            entry.size.unwrap_or_default(),
            content_type,
            media_type,
        ))
    }

    /// Delete one file. Deleting a missing file succeeds.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the backend fails.
    #[tracing::instrument(skip(self), fields(backend = self.store.name()))]
    pub async fn delete_file(&self, namespace: &str, file_name: &str) -> MemoriesResult<()> {
        self.reject("delete_file", namespace, check_namespace(namespace))?;
        self.reject("delete_file", namespace, check_file_name(file_name))?;

        let key = object_key(namespace, file_name);
        match self.store.delete(std::slice::from_ref(&key)).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(key = %key, "File already absent");
            }
            Err(e) => return Err(translate("delete_file", namespace, Some(&key), e).into()),
        }

        tracing::info!(key = %key, "Deleted file");
        Ok(())
    }

    /// Delete every file in a namespace with one batch call.
    ///
    /// An empty namespace succeeds without calling the backend's delete.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if listing or deleting fails.
    #[tracing::instrument(skip(self), fields(backend = self.store.name()))]
    pub async fn delete_namespace(&self, namespace: &str) -> MemoriesResult<()> {
        self.reject("delete_namespace", namespace, check_namespace(namespace))?;

        let keys: Vec<String> = self
            .raw_listing("delete_namespace", namespace)
            .await?
            .into_iter()
            .map(|entry| entry.key)
            .collect();

        if keys.is_empty() {
            tracing::debug!("Namespace already empty");
            return Ok(());
        }

        match self.store.delete(&keys).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!("Some files were already absent");
            }
            Err(e) => return Err(translate("delete_namespace", namespace, None, e).into()),
        }

        tracing::info!(count = keys.len(), "Deleted namespace");
        Ok(())
    }

    async fn raw_listing(
        &self,
        operation: &'static str,
        namespace: &str,
    ) -> MemoriesResult<Vec<ObjectEntry>> {
        let prefix = namespace_prefix(namespace);
        Ok(self
            .store
            .list(&prefix)
            .await
            .map_err(|e| translate(operation, namespace, None, e))?)
    }

    /// Sign a read link, logging and dropping any failure.
    async fn sign_quietly(
        &self,
        operation: &'static str,
        namespace: &str,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<SignedUrl> {
        let expires_at = self.expiry(now, ttl).ok()?;
        match self.store.sign_for_read(key, expires_at).await {
            Ok(url) => Some(SignedUrl::new(url, expires_at)),
            Err(e) => {
                tracing::warn!(operation, namespace, key, error = %e, "Failed to sign read URL");
                None
            }
        }
    }

    /// Content type for an entry the listing returned without one.
    async fn content_type_of(&self, operation: &'static str, namespace: &str, key: &str) -> String {
        let content_type = match self.store.head(key).await {
            Ok(entry) => entry.content_type,
            Err(e) => {
                tracing::warn!(operation, namespace, key, error = %e, "Failed to read object metadata");
                None
            }
        };
        content_type.unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
    }

    fn expiry(&self, now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, StorageError> {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                StorageError::new(StorageErrorKind::InvalidInput(format!(
                    "ttl out of range: {}s",
                    ttl.as_secs()
                )))
            })
    }

    /// Log a policy rejection, passing successes through.
    #[track_caller]
    fn reject<T>(
        &self,
        operation: &'static str,
        namespace: &str,
        result: Result<T, StorageError>,
    ) -> MemoriesResult<T> {
        result.map_err(|e| self.rejected(operation, namespace, e))
    }

    fn rejected(&self, operation: &'static str, namespace: &str, err: StorageError) -> MemoriesError {
        tracing::warn!(operation, namespace, reason = %err.kind, "Rejected request");
        err.into()
    }
}

/// Creation time from the backend, else from the key's timestamp prefix, else the epoch.
fn created_at(name: &str, entry: &ObjectEntry) -> DateTime<Utc> {
    entry
        .created_at
        .or_else(|| split_stored_name(name).map(|(at, _)| at))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
