//! Per-event media storage for Memories.
//!
//! Photos and videos uploaded for an event live under one namespace in an
//! object store. This crate decides what may be stored, where it goes, how
//! much a namespace may hold, and how clients reach stored files through
//! time-limited signed URLs.
//!
//! # Features
//!
//! - **Upload policy**: MIME allow-lists and per-class size ceilings
//! - **Quota accounting**: usage is recomputed from the store on every query
//! - **Signed links**: read and write URLs with explicit expiry
//! - **Pluggable backends**: in-memory, local filesystem, and S3 (feature `s3`)
//!
//! # Example
//!
//! ```rust
//! use memories_storage::{InMemoryStore, MemoriesConfig, StorageManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = StorageManager::new(Arc::new(InMemoryStore::default()), &MemoriesConfig::default());
//!
//! manager
//!     .upload_direct("evt1", "cake.png", "image/png", &[0u8; 1024])
//!     .await?;
//!
//! let files = manager.list_files("evt1").await?;
//! assert_eq!(files.len(), 1);
//!
//! let usage = manager.usage("evt1").await?;
//! assert_eq!(*usage.used_bytes(), 1024);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod file;
mod filesystem;
mod manager;
mod media_type;
mod memory;
mod path;
mod policy;
mod quota;
#[cfg(feature = "s3")]
mod s3;
mod store;
mod translate;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    BackendKind, LinkSettings, MAX_LINK_SECS, MemoriesConfig, StoreConfig, build_store,
};
pub use file::{FileMetadata, SignedUrl, StoredFile, UploadCandidate, UploadTicket};
pub use filesystem::{FileSystemStore, VerifiedUrl};
pub use manager::StorageManager;
pub use media_type::{MediaType, normalize_mime};
pub use memory::InMemoryStore;
pub use path::{
    KEY_ROOT, check_file_name, check_namespace, derive_key, namespace_prefix, object_key,
    relative_name, sanitize_file_name, split_stored_name,
};
pub use policy::{GIB, MIB, UploadPolicy};
pub use quota::{Quota, QuotaAccountant};
#[cfg(feature = "s3")]
pub use s3::S3Store;
pub use store::{ObjectEntry, ObjectStore};

pub use memories_error::{StorageError, StorageErrorKind};
