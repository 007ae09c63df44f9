//! Memories - per-event photo and video storage
//!
//! Memories stores the photos and videos guests upload for an event. Each
//! event is a namespace in an object store with its own quota; files are
//! reached through time-limited signed URLs.
//!
//! # Features
//!
//! - **Upload policy**: image and video allow-lists with per-class size ceilings
//! - **Quotas**: per-event usage recomputed from the store on every check
//! - **Signed links**: direct-upload URLs, post-upload links and share links
//! - **Backends**: in-memory, local filesystem, and S3-compatible (`s3` feature)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use memories::{MemoriesConfig, StorageManager, build_store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MemoriesConfig::load()?;
//!     let manager = StorageManager::new(build_store(&config.store)?, &config);
//!
//!     let stored = manager
//!         .upload_direct("wedding-2024", "first-dance.mp4", "video/mp4", &std::fs::read("first-dance.mp4")?)
//!         .await?;
//!     println!("Stored as {}", stored.name());
//!     Ok(())
//! }
//! ```
//!
//! # Cargo Features
//!
//! - `s3` - S3-compatible object storage through `object_store`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod observability;

pub use memories_error::*;
pub use memories_storage::*;
pub use observability::{ObservabilityConfig, init_observability};
