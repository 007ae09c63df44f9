//! Filesystem-based object store.
//!
//! Objects live at `{root}/{key}`. Per-object metadata (content type and
//! upload time) is kept in a JSON sidecar under `{root}/.meta/{key}.json`, out
//! of reach of any `events/` listing.

use crate::{ObjectEntry, ObjectStore};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use memories_error::{BackendError, BackendErrorKind, BackendResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const META_DIR: &str = ".meta";
const PARTIAL_DIR: &str = ".partial";

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    created_at: DateTime<Utc>,
}

/// A signed URL that passed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUrl {
    /// `GET` or `PUT`
    pub method: String,
    /// Storage key the URL grants access to
    pub key: String,
    /// Expiry carried by the URL
    pub expires_at: DateTime<Utc>,
}

/// Filesystem storage backend.
///
/// # Example Structure
///
/// ```text
/// /var/memories/
/// ├── events/
/// │   └── evt1/
/// │       ├── 1700000000123-My_Photo_.JPG
/// │       └── 1700000004567-clip.mp4
/// └── .meta/
///     ├── .partial/          (in-flight writes)
///     └── events/
///         └── evt1/
///             ├── 1700000000123-My_Photo_.JPG.json
///             └── 1700000004567-clip.mp4.json
/// ```
///
/// Writes go to a temp file which is then hard-linked into place, so an
/// object appears whole or not at all and an existing key is never
/// overwritten.
///
/// Signed URLs look like
/// `{base_url}/{key}?key={key}&method=GET&expires={unix_secs}&signature={hex}`
/// where the signature is HMAC-SHA256 over method, key and expiry. A file
/// server in front of `root` checks them with [`FileSystemStore::verify`].
pub struct FileSystemStore {
    root: PathBuf,
    base_url: String,
    secret: Vec<u8>,
}

impl std::fmt::Debug for FileSystemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemStore")
            .field("root", &self.root)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl FileSystemStore {
    /// Create a filesystem store rooted at `root`.
    ///
    /// Creates the root directory if it doesn't exist.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory that holds the `events/` tree
    /// * `base_url` - URL prefix the file server exposes `root` under
    /// * `secret` - Key for signing URLs
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    #[tracing::instrument(skip_all)]
    pub fn new(
        root: impl Into<PathBuf>,
        base_url: impl Into<String>,
        secret: impl Into<Vec<u8>>,
    ) -> BackendResult<Self> {
        let root = root.into();

        std::fs::create_dir_all(root.join(META_DIR).join(PARTIAL_DIR)).map_err(|e| {
            BackendError::new(BackendErrorKind::Io(format!("{}: {}", root.display(), e)))
        })?;

        tracing::info!(path = %root.display(), "Created filesystem store");
        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
        })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check a URL minted by this store.
    ///
    /// Returns `None` if the URL is malformed, was signed with another
    /// secret, was tampered with, or has expired at `now`.
    pub fn verify(&self, url: &str, now: DateTime<Utc>) -> Option<VerifiedUrl> {
        let parsed = Url::parse(url).ok()?;
        let mut key = None;
        let mut method = None;
        let mut expires = None;
        let mut signature = None;
        for (name, value) in parsed.query_pairs() {
            match name.as_ref() {
                "key" => key = Some(value.into_owned()),
                "method" => method = Some(value.into_owned()),
                "expires" => expires = value.parse::<i64>().ok(),
                "signature" => signature = hex::decode(value.as_bytes()).ok(),
                _ => {}
            }
        }
        let (key, method, expires, signature) = (key?, method?, expires?, signature?);

        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(signing_payload(&method, &key, expires).as_bytes());
        mac.verify_slice(&signature).ok()?;

        let expires_at = DateTime::<Utc>::from_timestamp(expires, 0)?;
        if expires_at <= now {
            tracing::debug!(key = %key, "Signed URL expired");
            return None;
        }
        Some(VerifiedUrl {
            method,
            key,
            expires_at,
        })
    }

    /// Map a key to its path, refusing anything that would leave `root`.
    fn object_path(&self, key: &str) -> BackendResult<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes || key.starts_with(META_DIR) {
            return Err(BackendError::new(BackendErrorKind::Io(format!(
                "invalid object key: {}",
                key
            ))));
        }
        Ok(self.root.join(relative))
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.root.join(META_DIR).join(format!("{}.json", key))
    }

    fn partial_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        self.root
            .join(META_DIR)
            .join(PARTIAL_DIR)
            .join(format!("{:x}-{}", hasher.finalize(), nanos))
    }

    fn sign(&self, method: &str, key: &str, expires_at: DateTime<Utc>) -> BackendResult<String> {
        let expires = expires_at.timestamp();

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| BackendError::new(BackendErrorKind::Io(format!("signing key: {}", e))))?;
        mac.update(signing_payload(method, key, expires).as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        let mut url = Url::parse(&format!("{}/{}", self.base_url, key)).map_err(|e| {
            BackendError::new(BackendErrorKind::Io(format!(
                "invalid base URL {}: {}",
                self.base_url, e
            )))
        })?;
        url.query_pairs_mut()
            .append_pair("key", key)
            .append_pair("method", method)
            .append_pair("expires", &expires.to_string())
            .append_pair("signature", &signature);
        Ok(url.into())
    }

    async fn read_sidecar(&self, key: &str) -> Option<Sidecar> {
        let raw = tokio::fs::read(self.sidecar_path(key)).await.ok()?;
        match serde_json::from_slice(&raw) {
            Ok(sidecar) => Some(sidecar),
            Err(e) => {
                tracing::warn!(key, error = %e, "Unreadable metadata sidecar");
                None
            }
        }
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
        Some(parts?.join("/"))
    }
}

fn signing_payload(method: &str, key: &str, expires: i64) -> String {
    format!("{}\n{}\n{}", method, key, expires)
}

fn io_error(context: impl std::fmt::Display, e: std::io::Error) -> BackendError {
    BackendError::new(BackendErrorKind::Io(format!("{}: {}", context, e)))
}

async fn remove_if_present(path: &Path) -> BackendResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(format!("delete {}", path.display()), e)),
    }
}

#[async_trait::async_trait]
impl ObjectStore for FileSystemStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> BackendResult<()> {
        let path = self.object_path(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent.display(), e))?;
        }

        // Write to a temp file first, then link into place for atomicity
        let partial = self.partial_path(key);
        tokio::fs::write(&partial, data)
            .await
            .map_err(|e| io_error(partial.display(), e))?;

        let linked = tokio::fs::hard_link(&partial, &path).await;
        if let Err(e) = tokio::fs::remove_file(&partial).await {
            tracing::warn!(path = %partial.display(), error = %e, "Failed to remove partial write");
        }
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(BackendError::new(BackendErrorKind::AlreadyExists(
                    key.to_string(),
                )));
            }
            Err(e) => return Err(io_error(format!("link {}", path.display()), e)),
        }

        let sidecar = Sidecar {
            content_type: content_type.to_string(),
            created_at: Utc::now(),
        };
        let sidecar_path = self.sidecar_path(key);
        let written = async {
            if let Some(parent) = sidecar_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let raw = serde_json::to_vec(&sidecar).map_err(std::io::Error::other)?;
            tokio::fs::write(&sidecar_path, raw).await
        }
        .await;

        if let Err(e) = written {
            // Without its metadata the object is only half written
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove object without metadata");
            }
            return Err(io_error(sidecar_path.display(), e));
        }

        tracing::info!(path = %path.display(), size = data.len(), "Stored object");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self, prefix: &str) -> BackendResult<Vec<ObjectEntry>> {
        // Walk the deepest directory the prefix fully names
        let start = match prefix.rfind('/') {
            Some(idx) => self.root.join(&prefix[..idx]),
            None => self.root.clone(),
        };

        let mut entries = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut read_dir = match tokio::fs::read_dir(&dir).await {
                Ok(read_dir) => read_dir,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(dir.display(), e)),
            };

            while let Some(item) = read_dir
                .next_entry()
                .await
                .map_err(|e| io_error(dir.display(), e))?
            {
                let path = item.path();
                let metadata = item
                    .metadata()
                    .await
                    .map_err(|e| io_error(path.display(), e))?;

                if metadata.is_dir() {
                    if path != self.root.join(META_DIR) {
                        pending.push(path);
                    }
                    continue;
                }

                let Some(key) = self.key_for(&path) else {
                    tracing::warn!(path = %path.display(), "Skipping non UTF-8 path");
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }

                let sidecar = self.read_sidecar(&key).await;
                let created_at = sidecar
                    .as_ref()
                    .map(|s| s.created_at)
                    .or_else(|| metadata.modified().ok().map(DateTime::<Utc>::from));
                entries.push(ObjectEntry {
                    key,
                    size: Some(metadata.len()),
                    content_type: sidecar.map(|s| s.content_type),
                    created_at,
                });
            }
        }

        tracing::debug!(count = entries.len(), "Listed objects");
        Ok(entries)
    }

    #[tracing::instrument(skip(self, keys), fields(count = keys.len()))]
    async fn delete(&self, keys: &[String]) -> BackendResult<()> {
        for key in keys {
            let path = self.object_path(key)?;
            remove_if_present(&path).await?;
            remove_if_present(&self.sidecar_path(key)).await?;
        }
        tracing::info!(count = keys.len(), "Deleted objects");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn sign_for_read(&self, key: &str, expires_at: DateTime<Utc>) -> BackendResult<String> {
        let path = self.object_path(key)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(path.display(), e))?;
        if !exists {
            return Err(BackendError::new(BackendErrorKind::NotFound(key.to_string())));
        }
        self.sign("GET", key, expires_at)
    }

    #[tracing::instrument(skip(self))]
    async fn sign_for_write(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
    ) -> BackendResult<String> {
        self.object_path(key)?;
        self.sign("PUT", key, expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> FileSystemStore {
        FileSystemStore::new(dir.path(), "http://localhost:8080/files", "secret").unwrap()
    }

    #[tokio::test]
    async fn test_signed_url_verifies() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.put("events/e/1-a.jpg", b"jpeg", "image/jpeg").await.unwrap();

        let expires_at = DateTime::<Utc>::from_timestamp(Utc::now().timestamp() + 60, 0).unwrap();
        let url = store
            .sign_for_read("events/e/1-a.jpg", expires_at)
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:8080/files/events/e/1-a.jpg?"));

        let verified = store.verify(&url, Utc::now()).unwrap();
        assert_eq!(verified.method, "GET");
        assert_eq!(verified.key, "events/e/1-a.jpg");
        assert_eq!(verified.expires_at, expires_at);
    }

    #[tokio::test]
    async fn test_tampered_or_expired_url_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let url = store
            .sign_for_write("events/e/1-a.jpg", Utc::now() + chrono::Duration::seconds(60))
            .await
            .unwrap();
        let tampered = url.replace("method=PUT", "method=GET");
        assert!(store.verify(&tampered, Utc::now()).is_none());

        let later = Utc::now() + chrono::Duration::seconds(120);
        assert!(store.verify(&url, later).is_none());

        let other = FileSystemStore::new(dir.path(), "http://localhost:8080/files", "other").unwrap();
        assert!(other.verify(&url, Utc::now()).is_none());
    }

    #[tokio::test]
    async fn test_partial_writes_are_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.put("events/e/1-a.jpg", b"jpeg", "image/jpeg").await.unwrap();
        assert!(store.put("events/e/1-a.jpg", b"again", "image/jpeg").await.is_err());

        let partial_dir = dir.path().join(META_DIR).join(PARTIAL_DIR);
        assert_eq!(std::fs::read_dir(partial_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_keys_cannot_escape_root() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(store.put("../escape.jpg", b"x", "image/jpeg").await.is_err());
        assert!(store.put("/abs.jpg", b"x", "image/jpeg").await.is_err());
        assert!(store.put(".meta/x.json", b"x", "image/jpeg").await.is_err());
    }
}
