//! Top-level error wrapper types.

use crate::{BackendError, ConfigError, StorageError, StorageErrorKind};

/// Every error the workspace can produce.
///
/// # Examples
///
/// ```
/// use memories_error::{ConfigError, MemoriesError};
///
/// let err: MemoriesError = ConfigError::new("bucket is required").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum MemoriesErrorKind {
    /// Storage policy or lifecycle error
    #[from(StorageError)]
    Storage(StorageError),
    /// Untranslated object store error
    #[from(BackendError)]
    Backend(BackendError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Memories error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Memories Error: {}", _0)]
pub struct MemoriesError(Box<MemoriesErrorKind>);

impl MemoriesError {
    /// Create a new error from a kind.
    pub fn new(kind: MemoriesErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MemoriesErrorKind {
        &self.0
    }

    /// The storage error kind, if this is a storage error.
    pub fn storage_kind(&self) -> Option<&StorageErrorKind> {
        match self.kind() {
            MemoriesErrorKind::Storage(e) => Some(&e.kind),
            _ => None,
        }
    }
}

impl<T> From<T> for MemoriesError
where
    T: Into<MemoriesErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Memories operations.
pub type MemoriesResult<T> = std::result::Result<T, MemoriesError>;
