//! Storage error types.

/// Kinds of storage errors surfaced to callers.
///
/// `UnsupportedType`, `TooLarge`, `QuotaExceeded` and `InvalidInput` are policy
/// rejections: they are detected before any mutating backend call and are
/// never worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StorageErrorKind {
    /// MIME type is outside both allow-lists
    #[display("Invalid file type: {}. Only images and videos are allowed", _0)]
    UnsupportedType(String),
    /// File exceeds the ceiling for its media class
    #[display("File too large. Maximum size is {}MB", limit_mib)]
    TooLarge {
        /// Ceiling for the media class, in MiB
        limit_mib: u64,
    },
    /// Upload would push the namespace past its quota
    #[display("Storage quota exceeded: {} of {} bytes used", used_bytes, total_bytes)]
    QuotaExceeded {
        /// Bytes in use at the time of the check
        used_bytes: u64,
        /// Quota ceiling in bytes
        total_bytes: u64,
    },
    /// Object does not exist
    #[display("File not found: {}", _0)]
    NotFound(String),
    /// Backend failed (network, auth, throttling, collision)
    #[display("Storage unavailable: {}", _0)]
    StoreUnavailable(String),
    /// Malformed caller input
    #[display("Invalid input: {}", _0)]
    InvalidInput(String),
}

impl StorageErrorKind {
    /// Whether this kind was decided locally, without consulting the backend.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            StorageErrorKind::UnsupportedType(_)
                | StorageErrorKind::TooLarge { .. }
                | StorageErrorKind::QuotaExceeded { .. }
                | StorageErrorKind::InvalidInput(_)
        )
    }
}

/// Storage error with location tracking.
///
/// # Examples
///
/// ```
/// use memories_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::TooLarge { limit_mib: 10 });
/// assert!(format!("{}", err).contains("Maximum size is 10MB"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new storage error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
