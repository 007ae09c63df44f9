//! Configuration for the storage engine.
//!
//! Loaded once at process start from layered TOML:
//! - Bundled defaults (include_str! from memories.toml)
//! - User overrides (~/.config/memories/memories.toml, then ./memories.toml)
//! - Environment overrides (`MEMORIES__<SECTION>__<KEY>`)

use crate::{FileSystemStore, InMemoryStore, ObjectStore, UploadPolicy};
use config::{Config, Environment, File, FileFormat};
use memories_error::{ConfigError, MemoriesError, MemoriesResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Which object store implementation to build.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local map; nothing persists
    #[display("memory")]
    Memory,
    /// Local directory with HMAC-signed URLs
    #[display("filesystem")]
    Filesystem,
    /// S3-compatible service (requires the `s3` feature)
    #[display("s3")]
    S3,
}

/// Object store connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to build
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Bucket (or container, or directory under `root`)
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Filesystem backend: directory that holds buckets
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Filesystem backend: URL prefix a file server exposes the bucket under
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Filesystem backend: URL signing key (falls back to `MEMORIES_SIGNING_SECRET`)
    #[serde(default, skip_serializing)]
    pub signing_secret: Option<String>,

    /// S3 backend: custom endpoint (MinIO and other S3-compatible services)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// S3 backend: region
    #[serde(default)]
    pub region: Option<String>,

    /// S3 backend: access key (falls back to `AWS_ACCESS_KEY_ID`)
    #[serde(default, skip_serializing)]
    pub access_key_id: Option<String>,

    /// S3 backend: secret key (falls back to `AWS_SECRET_ACCESS_KEY`)
    #[serde(default, skip_serializing)]
    pub secret_access_key: Option<String>,

    /// S3 backend: permit plain HTTP endpoints
    #[serde(default)]
    pub allow_http: bool,
}

fn default_backend() -> BackendKind {
    BackendKind::Filesystem
}

fn default_bucket() -> String {
    "event-photos".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080/files".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bucket: default_bucket(),
            root: Some(PathBuf::from("./data")),
            base_url: default_base_url(),
            signing_secret: None,
            endpoint: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            allow_http: false,
        }
    }
}

impl StoreConfig {
    /// Signing secret from config or `MEMORIES_SIGNING_SECRET`.
    pub fn resolved_signing_secret(&self) -> Option<String> {
        self.signing_secret
            .clone()
            .or_else(|| std::env::var("MEMORIES_SIGNING_SECRET").ok())
    }

    /// Access key from config or `AWS_ACCESS_KEY_ID`.
    pub fn resolved_access_key_id(&self) -> Option<String> {
        self.access_key_id
            .clone()
            .or_else(|| std::env::var("AWS_ACCESS_KEY_ID").ok())
    }

    /// Secret key from config or `AWS_SECRET_ACCESS_KEY`.
    pub fn resolved_secret_access_key(&self) -> Option<String> {
        self.secret_access_key
            .clone()
            .or_else(|| std::env::var("AWS_SECRET_ACCESS_KEY").ok())
    }

    /// Check backend-specific required settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("bucket is required".to_string());
        }
        match self.backend {
            BackendKind::Memory => {}
            BackendKind::Filesystem => {
                if self.root.is_none() {
                    return Err("root is required for the filesystem backend".to_string());
                }
            }
            BackendKind::S3 => {
                if self.endpoint.is_none() && self.region.is_none() {
                    return Err("endpoint or region is required for the s3 backend".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Longest lifetime any link may have: seven days, the S3 presigning limit.
pub const MAX_LINK_SECS: u64 = 7 * 24 * 60 * 60;

/// Link lifetimes and listing bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Lifetime of read links minted while listing (default 24h)
    #[serde(default = "default_listing_secs")]
    pub listing_secs: u64,

    /// Lifetime of the read link returned after an upload (default 7 days)
    #[serde(default = "default_upload_link_secs")]
    pub upload_link_secs: u64,

    /// Default lifetime of explicit share links (default 1h)
    #[serde(default = "default_share_secs")]
    pub share_secs: u64,

    /// Lifetime of direct-upload write URLs (default 5 minutes)
    #[serde(default = "default_upload_url_secs")]
    pub upload_url_secs: u64,

    /// Most entries one listing returns
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_listing_secs() -> u64 {
    24 * 60 * 60
}

fn default_upload_link_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_share_secs() -> u64 {
    60 * 60
}

fn default_upload_url_secs() -> u64 {
    5 * 60
}

fn default_list_limit() -> usize {
    1000
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            listing_secs: default_listing_secs(),
            upload_link_secs: default_upload_link_secs(),
            share_secs: default_share_secs(),
            upload_url_secs: default_upload_url_secs(),
            list_limit: default_list_limit(),
        }
    }
}

impl LinkSettings {
    /// Lifetime of listing read links.
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_secs)
    }

    /// Lifetime of the post-upload read link.
    pub fn upload_link_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_link_secs)
    }

    /// Default lifetime of share links.
    pub fn share_ttl(&self) -> Duration {
        Duration::from_secs(self.share_secs)
    }

    /// Lifetime of direct-upload write URLs.
    pub fn upload_url_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_url_secs)
    }

    /// Check that every lifetime is within `1..=MAX_LINK_SECS` and the listing
    /// limit is non-zero.
    pub fn validate(&self) -> Result<(), String> {
        let lifetimes = [
            ("listing_secs", self.listing_secs),
            ("upload_link_secs", self.upload_link_secs),
            ("share_secs", self.share_secs),
            ("upload_url_secs", self.upload_url_secs),
        ];
        if let Some((name, _)) = lifetimes.iter().find(|(_, secs)| *secs == 0) {
            return Err(format!("{} must be greater than zero", name));
        }
        if let Some((name, secs)) = lifetimes.iter().find(|(_, secs)| *secs > MAX_LINK_SECS) {
            return Err(format!(
                "{} is {}s, longer than the {}s maximum",
                name, secs, MAX_LINK_SECS
            ));
        }
        if self.list_limit == 0 {
            return Err("list_limit must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Top-level configuration.
///
/// # Example
///
/// ```no_run
/// use memories_storage::MemoriesConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = MemoriesConfig::load()?;
/// println!("Quota per event: {} bytes", config.policy.quota_bytes);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MemoriesConfig {
    /// Object store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Upload policy and quota
    #[serde(default)]
    pub policy: UploadPolicy,

    /// Link lifetimes
    #[serde(default)]
    pub links: LinkSettings,
}

impl MemoriesConfig {
    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> MemoriesResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                MemoriesError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                MemoriesError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> MemoriesResult<Self> {
        debug!("Loading layered configuration");

        const DEFAULT_CONFIG: &str = include_str!("../../../memories.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(config_dir) = dirs::home_dir() {
            let home_config = config_dir.join(".config/memories/memories.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("memories").required(false))
            .add_source(
                Environment::with_prefix("MEMORIES")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .map_err(|e| {
                MemoriesError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                MemoriesError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> MemoriesResult<()> {
        self.store
            .validate()
            .and_then(|_| self.policy.validate_settings())
            .and_then(|_| self.links.validate())
            .map_err(|e| MemoriesError::from(ConfigError::new(e)))
    }
}

/// Build the configured object store.
///
/// # Errors
///
/// Returns a configuration error if required settings are missing or the
/// backend was not compiled in, and a backend error if it fails to start.
#[instrument(skip(config), fields(backend = %config.backend, bucket = %config.bucket))]
pub fn build_store(config: &StoreConfig) -> MemoriesResult<Arc<dyn ObjectStore>> {
    config
        .validate()
        .map_err(|e| MemoriesError::from(ConfigError::new(e)))?;

    match config.backend {
        BackendKind::Memory => Ok(Arc::new(InMemoryStore::new(config.bucket.clone()))),
        BackendKind::Filesystem => {
            let root = config
                .root
                .as_ref()
                .ok_or_else(|| ConfigError::new("root is required for the filesystem backend"))?;
            let secret = config.resolved_signing_secret().ok_or_else(|| {
                ConfigError::new(
                    "signing_secret (or MEMORIES_SIGNING_SECRET) is required for the filesystem backend",
                )
            })?;
            let store = FileSystemStore::new(
                root.join(&config.bucket),
                format!("{}/{}", config.base_url.trim_end_matches('/'), config.bucket),
                secret,
            )?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "s3")]
        BackendKind::S3 => Ok(Arc::new(crate::S3Store::from_config(config)?)),
        #[cfg(not(feature = "s3"))]
        BackendKind::S3 => {
            Err(ConfigError::new("the s3 backend requires the `s3` feature").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MemoriesConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.links.share_ttl(), Duration::from_secs(3600));
        assert_eq!(config.links.listing_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.links.upload_link_ttl(), Duration::from_secs(604_800));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let links = LinkSettings {
            share_secs: 0,
            ..LinkSettings::default()
        };
        assert!(links.validate().unwrap_err().contains("share_secs"));
    }

    #[test]
    fn test_overlong_ttl_rejected() {
        let links = LinkSettings {
            upload_link_secs: MAX_LINK_SECS,
            ..LinkSettings::default()
        };
        assert!(links.validate().is_ok());

        let links = LinkSettings {
            listing_secs: u64::MAX,
            ..LinkSettings::default()
        };
        assert!(links.validate().unwrap_err().contains("listing_secs"));
    }

    #[test]
    fn test_s3_needs_location() {
        let store = StoreConfig {
            backend: BackendKind::S3,
            ..StoreConfig::default()
        };
        assert!(store.validate().is_err());
    }

    #[test]
    fn test_memory_store_builds() {
        let store = build_store(&StoreConfig {
            backend: BackendKind::Memory,
            ..StoreConfig::default()
        })
        .unwrap();
        assert_eq!(store.name(), "memory");
    }
}
