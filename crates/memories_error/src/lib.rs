//! Error types for the Memories event media store.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Object store backends report [`BackendError`]s. The storage manager is the
//! only place that translates them into [`StorageError`]s, which are what
//! callers see.
//!
//! # Examples
//!
//! ```
//! use memories_error::{MemoriesResult, StorageError, StorageErrorKind};
//!
//! fn check(mime: &str) -> MemoriesResult<()> {
//!     Err(StorageError::new(StorageErrorKind::UnsupportedType(mime.to_string())))?
//! }
//!
//! let err = check("application/pdf").unwrap_err();
//! assert!(matches!(
//!     err.storage_kind(),
//!     Some(StorageErrorKind::UnsupportedType(_))
//! ));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod config;
mod error;
mod storage;

pub use backend::{BackendError, BackendErrorKind, BackendResult};
pub use config::ConfigError;
pub use error::{MemoriesError, MemoriesErrorKind, MemoriesResult};
pub use storage::{StorageError, StorageErrorKind};
